//! # Configuration
//! Environment-driven settings for the aggregator: cycle intervals, buffer
//! capacities, endpoint URLs, and instrument lists. Values come from the
//! process environment (a local `.env` is honored via `dotenvy` in the
//! binary), with validated defaults for everything except credentials.

use anyhow::{bail, Result};

pub const ENV_NEWS_CYCLE_SECS: &str = "NEWS_CYCLE_SECS";
pub const ENV_MARKET_CYCLE_SECS: &str = "MARKET_CYCLE_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";
pub const ENV_HISTORY_CAPACITY: &str = "SENTIMENT_HISTORY_CAPACITY";
pub const ENV_SOURCES_CONFIG_PATH: &str = "SOURCES_CONFIG_PATH";
pub const ENV_QUOTE_API_URL: &str = "QUOTE_API_URL";
pub const ENV_QUOTE_API_TOKEN: &str = "QUOTE_API_TOKEN";
pub const ENV_EXCHANGE_API_URL: &str = "EXCHANGE_API_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";

pub const DEFAULT_NEWS_CYCLE_SECS: u64 = 30;
pub const DEFAULT_MARKET_CYCLE_SECS: u64 = 45;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;
pub const DEFAULT_SOURCES_CONFIG_PATH: &str = "config/sources.toml";
pub const DEFAULT_QUOTE_API_URL: &str = "https://api-fxpractice.oanda.com";
pub const DEFAULT_EXCHANGE_API_URL: &str = "https://api.binance.com";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// How many of the most recent samples feed `current_sentiment()`.
pub const RECENT_SAMPLE_WINDOW: usize = 10;
/// How many samples the trend regression looks back over.
pub const TREND_WINDOW: usize = 20;
/// Minimum samples before a trend is reported at all.
pub const TREND_MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub news_interval_secs: u64,
    pub market_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub history_capacity: usize,
    pub sources_path: String,
    pub quote_api_url: String,
    /// Bearer token for the quote endpoint; without it the FX side of the
    /// market cycle is skipped (degraded, not fatal).
    pub quote_api_token: Option<String>,
    pub exchange_api_url: String,
    pub bind_addr: String,
    pub fx_instruments: Vec<String>,
    pub crypto_pairs: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the environment and validate it.
    pub fn from_env() -> Result<Self> {
        let cfg = Self {
            news_interval_secs: parse_env_u64(ENV_NEWS_CYCLE_SECS, DEFAULT_NEWS_CYCLE_SECS),
            market_interval_secs: parse_env_u64(ENV_MARKET_CYCLE_SECS, DEFAULT_MARKET_CYCLE_SECS),
            request_timeout_secs: parse_env_u64(
                ENV_REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            history_capacity: parse_env_usize(ENV_HISTORY_CAPACITY, DEFAULT_HISTORY_CAPACITY),
            sources_path: env_or(ENV_SOURCES_CONFIG_PATH, DEFAULT_SOURCES_CONFIG_PATH),
            quote_api_url: env_or(ENV_QUOTE_API_URL, DEFAULT_QUOTE_API_URL),
            quote_api_token: std::env::var(ENV_QUOTE_API_TOKEN)
                .ok()
                .filter(|s| !s.trim().is_empty()),
            exchange_api_url: env_or(ENV_EXCHANGE_API_URL, DEFAULT_EXCHANGE_API_URL),
            bind_addr: env_or(ENV_BIND_ADDR, DEFAULT_BIND_ADDR),
            fx_instruments: default_fx_instruments(),
            crypto_pairs: default_crypto_pairs(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.news_interval_secs < 5 {
            bail!("news cycle interval must be at least 5 seconds");
        }
        if self.market_interval_secs < 5 {
            bail!("market cycle interval must be at least 5 seconds");
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be positive");
        }
        // The sample buffer holds at least 1000 entries; only raising it is allowed.
        if self.history_capacity < DEFAULT_HISTORY_CAPACITY {
            bail!(
                "history capacity must be at least {}",
                DEFAULT_HISTORY_CAPACITY
            );
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            news_interval_secs: DEFAULT_NEWS_CYCLE_SECS,
            market_interval_secs: DEFAULT_MARKET_CYCLE_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            sources_path: DEFAULT_SOURCES_CONFIG_PATH.to_string(),
            quote_api_url: DEFAULT_QUOTE_API_URL.to_string(),
            quote_api_token: None,
            exchange_api_url: DEFAULT_EXCHANGE_API_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            fx_instruments: default_fx_instruments(),
            crypto_pairs: default_crypto_pairs(),
        }
    }
}

fn default_fx_instruments() -> Vec<String> {
    [
        "EUR_USD", "GBP_USD", "USD_JPY", "USD_CHF", "AUD_USD", "USD_CAD", "NZD_USD",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_crypto_pairs() -> Vec<String> {
    ["BTCUSDT", "ETHUSDT"].iter().map(|s| s.to_string()).collect()
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn defaults_are_valid() {
        std::env::remove_var(ENV_NEWS_CYCLE_SECS);
        std::env::remove_var(ENV_MARKET_CYCLE_SECS);
        std::env::remove_var(ENV_HISTORY_CAPACITY);
        let cfg = AppConfig::from_env().expect("defaults must validate");
        assert_eq!(cfg.news_interval_secs, DEFAULT_NEWS_CYCLE_SECS);
        assert_eq!(cfg.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(cfg.fx_instruments.len(), 7);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        std::env::set_var(ENV_NEWS_CYCLE_SECS, "60");
        std::env::set_var(ENV_MARKET_CYCLE_SECS, "not-a-number");
        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.news_interval_secs, 60);
        assert_eq!(cfg.market_interval_secs, DEFAULT_MARKET_CYCLE_SECS);
        std::env::remove_var(ENV_NEWS_CYCLE_SECS);
        std::env::remove_var(ENV_MARKET_CYCLE_SECS);
    }

    #[serial_test::serial]
    #[test]
    fn capacity_below_floor_is_rejected() {
        std::env::set_var(ENV_HISTORY_CAPACITY, "10");
        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("history capacity"));
        std::env::remove_var(ENV_HISTORY_CAPACITY);
    }
}
