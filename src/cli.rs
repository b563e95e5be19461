//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Telegram bot analysing token holders with Bubblemaps and CoinGecko data
#[derive(Parser, Debug)]
#[command(name = "bubblemap-bot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "BUBBLEMAP_BOT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port for the map-data view
    #[arg(short, long, env = "BUBBLEMAP_BOT_PORT", global = true)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "BUBBLEMAP_BOT_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "BUBBLEMAP_BOT_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to bot mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the Telegram bot (default)
    Bot,

    /// Serve the map-data view over HTTP
    Serve,

    /// Analyse one token and print the report
    Analyze {
        /// Token contract address
        address: String,

        /// Chain code (eth, bsc, ftm, avax, cro, arbi, poly, base, sol, sonic)
        #[arg(long, default_value = "eth")]
        chain: String,

        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_bot_mode() {
        let cli = Cli::try_parse_from(["bubblemap-bot"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::try_parse_from([
            "bubblemap-bot",
            "analyze",
            "0xabc",
            "--chain",
            "bsc",
            "--json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Analyze {
                address: "0xabc".to_string(),
                chain: "bsc".to_string(),
                json: true,
            })
        );
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_analyze_requires_address() {
        assert!(Cli::try_parse_from(["bubblemap-bot", "analyze"]).is_err());
    }

    #[test]
    fn test_serve_with_port() {
        let cli = Cli::try_parse_from(["bubblemap-bot", "serve", "--port", "9000"]).unwrap();
        assert_eq!(cli.command, Some(Command::Serve));
        assert_eq!(cli.port, Some(9000));
    }
}
