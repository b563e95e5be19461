//! Minimal Telegram Bot API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::TelegramConfig;
use crate::failsafe::{RetryPolicy, with_retry};
use crate::{Error, Result};

const SERVICE: &str = "Telegram";

/// Extra time on top of the long-poll timeout before the request times out
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Incoming update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id
    pub update_id: i64,
    /// New message, if this update carries one
    #[serde(default)]
    pub message: Option<Message>,
}

/// Chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Chat the message belongs to
    pub chat: Chat,
    /// Text body, absent for media messages
    #[serde(default)]
    pub text: Option<String>,
}

/// Chat reference
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Chat id
    pub id: i64,
}

/// Entry of the bot's command menu
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotCommand {
    /// Command without the leading slash
    pub command: String,
    /// Menu description
    pub description: String,
}

impl BotCommand {
    /// Create a menu entry
    pub fn new(command: &str, description: &str) -> Self {
        Self {
            command: command.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// Outbound side of a chat: what handlers need to answer users.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;
    /// Replace the bot's command menu.
    async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()>;
}

/// Telegram Bot API over HTTPS
pub struct TelegramApi {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl TelegramApi {
    /// Create a client for bot `token`
    pub fn new(client: Client, config: &TelegramConfig, token: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: format!("{}/bot{token}", config.api_base.trim_end_matches('/')),
            retry,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value, timeout: Option<Duration>) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(Error::Upstream {
                service: SERVICE,
                status: status.as_u16(),
            });
        }

        let parsed: ApiResponse<T> = response.json().await?;
        if !parsed.ok {
            return Err(Error::Telegram(format!(
                "{method}: {}",
                parsed.description.unwrap_or_else(|| format!("HTTP {status}"))
            )));
        }
        parsed
            .result
            .ok_or_else(|| Error::Telegram(format!("{method}: missing result")))
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        let updates: Vec<Update> = self
            .call("getUpdates", &body, Some(poll_timeout + POLL_GRACE))
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "Received updates");
        }
        Ok(updates)
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "text": text });
        let body = &body;
        with_retry(&self.retry, "sendMessage", || async move {
            self.call::<Value>("sendMessage", body, None).await.map(|_| ())
        })
        .await
    }

    async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let body = json!({ "commands": commands });
        let body = &body;
        with_retry(&self.retry, "setMyCommands", || async move {
            self.call::<Value>("setMyCommands", body, None).await.map(|_| ())
        })
        .await
    }
}
