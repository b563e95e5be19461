//! Chat commands and replies

use tracing::{error, info, warn};

use super::api::{BotCommand, Messenger};
use crate::analyzer::TokenAnalyzer;
use crate::report;
use crate::token::Chain;

/// Reply to `/start`
pub const WELCOME_TEXT: &str = "Welcome to the Bubblemaps Bot! 💰📈\n\
I can help you analyze top traders for any token. \
Send me a contract address to get started!\n\
Please specify the chain (e.g., eth, bsc) if needed, default is eth.";

/// Reply to `/help`
pub const HELP_TEXT: &str = "💰 Bubblemaps Bot Help 📈\n\
1. Send a token contract address to analyze top traders (e.g., '0x123...').\n\
2. Optionally specify the chain (e.g., '0x123... bsc'). Default is eth.\n\
3. Use the menu for more options.";

/// Reply to `/about`
pub const ABOUT_TEXT: &str = "💰 Bubblemaps Bot 📈\n\
I analyze the top traders of a token and show their connections, powered by Bubblemaps API.\n\
Learn more at https://bubblemaps.io/";

/// Reply when the analysis fails
pub const FETCH_FAILED_TEXT: &str =
    "Sorry, I couldn't fetch data for that token. Please try another address.";

/// What a user message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/about`
    About,
    /// Analyse a token
    Analyze {
        /// Contract address as typed
        address: String,
        /// Target chain
        chain: Chain,
    },
    /// A chain code that is not supported
    UnsupportedChain(String),
    /// A slash command the bot does not know
    UnknownCommand(String),
    /// Blank message
    Empty,
}

/// Classify a text message: a command, or `<address> [chain]`
#[must_use]
pub fn parse_request(text: &str) -> Request {
    let mut parts = text.split_whitespace();
    let Some(first) = parts.next() else {
        return Request::Empty;
    };

    if let Some(command) = first.strip_prefix('/') {
        // Group chats address commands as /cmd@BotName
        let command = command.split('@').next().unwrap_or(command);
        return match command.to_ascii_lowercase().as_str() {
            "start" => Request::Start,
            "help" => Request::Help,
            "about" => Request::About,
            _ => Request::UnknownCommand(command.to_string()),
        };
    }

    let chain = match parts.next() {
        None => Chain::default(),
        Some(code) => match code.to_ascii_lowercase().parse::<Chain>() {
            Ok(chain) => chain,
            Err(_) => return Request::UnsupportedChain(code.to_string()),
        },
    };

    Request::Analyze {
        address: first.to_string(),
        chain,
    }
}

/// Entries registered with `setMyCommands` on `/start`
#[must_use]
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("help", "Get help"),
        BotCommand::new("about", "About this bot"),
    ]
}

fn unsupported_chain_text(code: &str) -> String {
    format!(
        "Unsupported chain '{code}'. Supported chains: {}",
        Chain::supported_codes()
    )
}

/// Answer one text message from `chat_id`
pub async fn handle_text(messenger: &dyn Messenger, analyzer: &TokenAnalyzer, chat_id: i64, text: &str) {
    match parse_request(text) {
        Request::Start => {
            if let Err(e) = messenger.set_my_commands(&bot_commands()).await {
                error!(error = %e, "Failed to register bot commands");
            }
            reply(messenger, chat_id, WELCOME_TEXT).await;
        }
        Request::Help => {
            reply(messenger, chat_id, HELP_TEXT).await;
        }
        Request::About => {
            reply(messenger, chat_id, ABOUT_TEXT).await;
        }
        Request::UnknownCommand(command) => {
            info!(chat_id, command = %command, "Unknown command");
            reply(messenger, chat_id, HELP_TEXT).await;
        }
        Request::UnsupportedChain(code) => {
            reply(messenger, chat_id, &unsupported_chain_text(&code)).await;
        }
        Request::Empty => {}
        Request::Analyze { address, chain } => {
            info!(chat_id, address = %address, chain = %chain, "Analysis requested");
            let ack = format!("Fetching data for contract address: {address} on chain {chain}... 💰");
            if !reply(messenger, chat_id, &ack).await {
                return;
            }

            match analyzer.get_or_compute(&address, chain).await {
                Ok(record) => {
                    reply(messenger, chat_id, &report::render(&record)).await;
                }
                Err(e) => {
                    warn!(address = %address, chain = %chain, error = %e, "Analysis failed");
                    reply(messenger, chat_id, FETCH_FAILED_TEXT).await;
                }
            }
        }
    }
}

/// Send `text`, logging a final failure. Returns whether it was delivered.
async fn reply(messenger: &dyn Messenger, chat_id: i64, text: &str) -> bool {
    match messenger.send_message(chat_id, text).await {
        Ok(()) => true,
        Err(e) => {
            error!(chat_id, error = %e, "Failed to send message");
            false
        }
    }
}
