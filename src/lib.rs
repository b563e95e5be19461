//! Bubblemap Bot Library
//!
//! Analyses token holder structure for a Telegram bot.
//!
//! # Features
//!
//! - **Market data**: contract address → CoinGecko id → price, market cap, volume
//! - **Transfer graph**: Bubblemaps map data reduced to the top traders and
//!   the links between them
//! - **Cache**: every `(chain, address)` is computed once and stored
//! - **Front ends**: Telegram long-polling bot, JSON map-data view, one-shot CLI

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analyzer;
pub mod bot;
pub mod bubblemaps;
pub mod cli;
pub mod config;
pub mod error;
pub mod failsafe;
pub mod graph;
pub mod http;
pub mod market;
pub mod report;
pub mod server;
pub mod store;
pub mod token;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
