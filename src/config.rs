//! Configuration management

use std::{env, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Prefix of environment variables that override config values
pub const ENV_PREFIX: &str = "BUBBLEMAP_BOT_";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    /// Variables are set into the process environment for `${VAR}` resolution.
    pub env_files: Vec<String>,
    /// Telegram Bot API configuration
    pub telegram: TelegramConfig,
    /// Bubblemaps endpoints (map data and map metadata)
    pub bubblemaps: BubblemapsConfig,
    /// `CoinGecko` endpoints
    pub coingecko: CoinGeckoConfig,
    /// Outbound HTTP client settings
    pub http: HttpConfig,
    /// Token record store
    pub store: StoreConfig,
    /// Map-data view server
    pub server: ServerConfig,
    /// Retry policy for Telegram calls
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_files: vec![".env".to_string()],
            telegram: TelegramConfig::default(),
            bubblemaps: BubblemapsConfig::default(),
            coingecko: CoinGeckoConfig::default(),
            http: HttpConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token (supports `${VAR}` expansion)
    pub token: String,
    /// Bot API base URL
    pub api_base: String,
    /// Long-polling timeout passed to `getUpdates`
    #[serde(with = "humantime_serde")]
    pub poll_timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: "${TELEGRAM_TOKEN:-}".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            poll_timeout: Duration::from_secs(30),
        }
    }
}

/// Bubblemaps endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubblemapsConfig {
    /// Map-data endpoint (nodes and links)
    pub map_data_url: String,
    /// Map-metadata endpoint (decentralisation score, identified supply)
    pub map_metadata_url: String,
}

impl Default for BubblemapsConfig {
    fn default() -> Self {
        Self {
            map_data_url: "${BUBBLEMAPS_API_URL:-}".to_string(),
            map_metadata_url: "${SCORE_API_URL:-}".to_string(),
        }
    }
}

/// `CoinGecko` endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    /// Coin catalog including platform contract addresses
    pub coins_list_url: String,
    /// Coin detail endpoint; `{id}` is replaced by the coin id
    pub coin_data_url: String,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            coins_list_url: "https://api.coingecko.com/api/v3/coins/list?include_platform=true"
                .to_string(),
            coin_data_url: "https://api.coingecko.com/api/v3/coins/{id}?localization=false&tickers=false&market_data=true&community_data=false&developer_data=false".to_string(),
        }
    }
}

impl CoinGeckoConfig {
    /// Coin detail URL for `coin_id`
    #[must_use]
    pub fn coin_url(&self, coin_id: &str) -> String {
        self.coin_data_url.replace("{id}", coin_id)
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("bubblemap-bot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Which store keeps analysed tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map, lost on restart
    Memory,
    /// One JSON file per token
    #[default]
    File,
}

/// Token record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store backend
    pub backend: StoreBackend,
    /// Directory for the file backend (supports ~)
    pub directory: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            directory: "~/.bubblemap-bot/tokens".to_string(),
        }
    }
}

impl StoreConfig {
    /// Directory with `~` expanded
    #[must_use]
    pub fn resolved_directory(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.directory))
    }
}

/// Map-data view server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout (covers a full token analysis)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries
    pub enabled: bool,
    /// Maximum attempts, first try included
    pub max_attempts: u32,
    /// Initial backoff duration
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Backoff multiplier (1.0 keeps the delay constant)
    pub multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(10),
            multiplier: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files first so ${VAR} can see their values
        config.load_env_files();
        config.expand_env_vars();

        Ok(config)
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = expand_home(path_str);
            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in string settings
    fn expand_env_vars(&mut self) {
        let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") else {
            return;
        };

        for value in [
            &mut self.telegram.token,
            &mut self.telegram.api_base,
            &mut self.bubblemaps.map_data_url,
            &mut self.bubblemaps.map_metadata_url,
            &mut self.coingecko.coins_list_url,
            &mut self.coingecko.coin_data_url,
            &mut self.store.directory,
        ] {
            *value = Self::expand_string(&re, value);
        }
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }

    /// Check that both Bubblemaps endpoints are set and parse as URLs
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing or malformed URL.
    pub fn validate_sources(&self) -> Result<()> {
        for (name, value) in [
            ("bubblemaps.map_data_url (BUBBLEMAPS_API_URL)", &self.bubblemaps.map_data_url),
            ("bubblemaps.map_metadata_url (SCORE_API_URL)", &self.bubblemaps.map_metadata_url),
            ("coingecko.coins_list_url", &self.coingecko.coins_list_url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{name} is not set")));
            }
            Url::parse(value).map_err(|e| Error::Config(format!("{name} is invalid: {e}")))?;
        }
        Ok(())
    }

    /// Telegram bot token, required by the bot front end
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no token is configured.
    pub fn telegram_token(&self) -> Result<&str> {
        let token = self.telegram.token.trim();
        if token.is_empty() {
            return Err(Error::Config(
                "TELEGRAM_TOKEN not set. Put it in .env or set telegram.token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Replace a leading `~` with the home directory
fn expand_home(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.display().to_string(), 1);
        }
    }
    path.to_string()
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" before "s" and "m": both are suffixes of "100ms"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
