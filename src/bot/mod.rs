//! Telegram front end
//!
//! Long-polls the Bot API and answers each message in its own task, so a
//! slow analysis never holds up the next update.

mod api;
mod handlers;

pub use api::{BotCommand, Chat, Message, Messenger, TelegramApi, Update};
pub use handlers::{
    ABOUT_TEXT, FETCH_FAILED_TEXT, HELP_TEXT, Request, WELCOME_TEXT, bot_commands, handle_text,
    parse_request,
};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::Result;
use crate::analyzer::TokenAnalyzer;
use crate::config::Config;
use crate::failsafe::RetryPolicy;
use crate::http::build_client;
use crate::server::shutdown_signal;

/// Pause after a failed `getUpdates`
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polling bot
pub struct Bot {
    api: Arc<TelegramApi>,
    analyzer: Arc<TokenAnalyzer>,
    poll_timeout: Duration,
}

impl Bot {
    /// Create a bot from its parts
    pub fn new(api: Arc<TelegramApi>, analyzer: Arc<TokenAnalyzer>, poll_timeout: Duration) -> Self {
        Self {
            api,
            analyzer,
            poll_timeout,
        }
    }

    /// Build the Bot API client described by `config`
    pub fn from_config(config: &Config, analyzer: Arc<TokenAnalyzer>) -> Result<Self> {
        let token = config.telegram_token()?;
        let client = build_client(&config.http)?;
        let api = TelegramApi::new(
            client,
            &config.telegram,
            token,
            RetryPolicy::new(&config.retry),
        );
        Ok(Self::new(
            Arc::new(api),
            analyzer,
            config.telegram.poll_timeout,
        ))
    }

    /// Poll for updates until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Poll for updates until `shutdown` resolves
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("Bot is running...");
        tokio::pin!(shutdown);

        let mut offset = 0;
        loop {
            let polled = tokio::select! {
                () = &mut shutdown => break,
                polled = self.api.get_updates(offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch updates");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {}
                    }
                }
            }
        }

        info!("Bot stopped");
        Ok(())
    }

    fn dispatch(&self, update: Update) {
        let Some(Message { chat, text: Some(text) }) = update.message else {
            debug!(update_id = update.update_id, "Ignoring non-text update");
            return;
        };

        let api = Arc::clone(&self.api);
        let analyzer = Arc::clone(&self.analyzer);
        tokio::spawn(async move {
            handle_text(api.as_ref(), &analyzer, chat.id, &text).await;
        });
    }
}
