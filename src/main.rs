//! Bubblemap Bot - token holder analysis for Telegram

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use bubblemap_bot::{
    analyzer::TokenAnalyzer,
    bot::Bot,
    cli::{Cli, Command},
    config::Config,
    report, server, setup_tracing,
    token::Chain,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    match cli.command {
        Some(Command::Analyze {
            address,
            chain,
            json,
        }) => run_analyze(&config, &address, &chain, json).await,
        Some(Command::Serve) => run_server(&config).await,
        Some(Command::Bot) | None => run_bot(&config).await,
    }
}

async fn build_analyzer(config: &Config) -> Option<Arc<TokenAnalyzer>> {
    match TokenAnalyzer::from_config(config).await {
        Ok(analyzer) => Some(Arc::new(analyzer)),
        Err(e) => {
            error!("Failed to initialise analyzer: {e}");
            None
        }
    }
}

/// Run the Telegram bot
async fn run_bot(config: &Config) -> ExitCode {
    let Some(analyzer) = build_analyzer(config).await else {
        return ExitCode::FAILURE;
    };

    let bot = match Bot::from_config(config, analyzer) {
        Ok(bot) => bot,
        Err(e) => {
            error!("Failed to create bot: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Bubblemap Bot");
    if let Err(e) = bot.run().await {
        error!("Bot error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Serve the map-data view
async fn run_server(config: &Config) -> ExitCode {
    let Some(analyzer) = build_analyzer(config).await else {
        return ExitCode::FAILURE;
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "Starting map-data server"
    );
    if let Err(e) = server::serve(&config.server, analyzer).await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Analyse one token and print the result
async fn run_analyze(config: &Config, address: &str, chain: &str, json: bool) -> ExitCode {
    let chain: Chain = match chain.to_ascii_lowercase().parse() {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("❌ {e}. Supported chains: {}", Chain::supported_codes());
            return ExitCode::FAILURE;
        }
    };

    let Some(analyzer) = build_analyzer(config).await else {
        return ExitCode::FAILURE;
    };

    let record = match analyzer.get_or_compute(address, chain).await {
        Ok(record) => record,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        match serde_json::to_string_pretty(&record) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize to JSON: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report::render(&record));
    }
    ExitCode::SUCCESS
}
