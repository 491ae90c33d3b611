// src/market/mod.rs
//! # Market data collection
//! Price/volume snapshots for the configured FX instruments plus a small
//! crypto set, independent of the news pipeline. The snapshot feeds the
//! aggregator's market-sentiment component.
//!
//! Failure policy: an instrument whose fetch fails is omitted (partial
//! snapshots are valid); an exchange that is unreachable at startup leaves
//! the crypto side permanently empty. No retries inside a cycle — the next
//! scheduled cycle retries naturally.

pub mod candles;
pub mod exchange;

use std::collections::HashMap;

use anyhow::Result;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::AppConfig;
use crate::ingest::now_unix;

use self::candles::CandlesClient;
use self::exchange::ExchangeClient;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "market_fetch_errors_total",
            "Per-instrument market data fetch failures."
        );
    });
}

/// Most recent price state of one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentQuote {
    pub price: f64,
    /// Absolute change against the previous bar / 24h-open.
    pub change: f64,
    /// Percent change, e.g. `-0.28` for -0.28%.
    pub change_pct: f64,
    pub volume: Option<f64>,
}

/// One market scan. Only the latest snapshot is retained by the aggregator.
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub ts_unix: u64,
    pub fx: HashMap<String, InstrumentQuote>,
    pub crypto: HashMap<String, InstrumentQuote>,
}

impl MarketSnapshot {
    pub fn empty(ts_unix: u64) -> Self {
        Self {
            ts_unix,
            fx: HashMap::new(),
            crypto: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fx.len() + self.crypto.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signed percent changes across both instrument sets.
    pub fn percent_changes(&self) -> impl Iterator<Item = f64> + '_ {
        self.fx
            .values()
            .chain(self.crypto.values())
            .map(|q| q.change_pct)
    }
}

/// Fetches quotes for the fixed instrument lists.
pub struct MarketCollector {
    fx: Option<CandlesClient>,
    crypto: Option<ExchangeClient>,
    fx_instruments: Vec<String>,
    crypto_pairs: Vec<String>,
}

impl MarketCollector {
    /// Build clients from config. The quote side needs a token; without one
    /// the FX half is skipped. The exchange is probed once here: if it does
    /// not answer (blocked region, outage), the crypto half stays disabled
    /// for the process lifetime. Only HTTP-client construction is fatal.
    pub async fn connect(cfg: &AppConfig) -> Result<Self> {
        let fx = match &cfg.quote_api_token {
            Some(token) => Some(CandlesClient::new(
                &cfg.quote_api_url,
                token,
                cfg.request_timeout_secs,
            )?),
            None => {
                tracing::warn!(target: "market", "no quote api token; fx collection disabled");
                None
            }
        };

        let crypto =
            match ExchangeClient::connect(&cfg.exchange_api_url, cfg.request_timeout_secs).await {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!(
                        target: "market",
                        error = ?e,
                        "exchange unreachable at startup; crypto collection disabled"
                    );
                    None
                }
            };

        Ok(Self {
            fx,
            crypto,
            fx_instruments: cfg.fx_instruments.clone(),
            crypto_pairs: cfg.crypto_pairs.clone(),
        })
    }

    /// Assemble from prebuilt clients (tests, custom wiring).
    pub fn from_clients(
        fx: Option<CandlesClient>,
        crypto: Option<ExchangeClient>,
        fx_instruments: Vec<String>,
        crypto_pairs: Vec<String>,
    ) -> Self {
        Self {
            fx,
            crypto,
            fx_instruments,
            crypto_pairs,
        }
    }

    pub fn crypto_enabled(&self) -> bool {
        self.crypto.is_some()
    }

    /// One scan over both instrument sets. Failed instruments are logged,
    /// counted, and omitted; the snapshot is whatever succeeded.
    pub async fn collect(&self) -> MarketSnapshot {
        ensure_metrics_described();
        let mut snapshot = MarketSnapshot::empty(now_unix());

        if let Some(fx) = &self.fx {
            for instrument in &self.fx_instruments {
                match fx.latest_quote(instrument).await {
                    Ok(q) => {
                        snapshot.fx.insert(instrument.clone(), q);
                    }
                    Err(e) => {
                        tracing::warn!(target: "market", error = ?e, %instrument, "fx quote failed");
                        counter!("market_fetch_errors_total").increment(1);
                    }
                }
            }
        }

        if let Some(crypto) = &self.crypto {
            for pair in &self.crypto_pairs {
                match crypto.ticker(pair).await {
                    Ok(q) => {
                        snapshot.crypto.insert(pair.clone(), q);
                    }
                    Err(e) => {
                        tracing::warn!(target: "market", error = ?e, %pair, "crypto ticker failed");
                        counter!("market_fetch_errors_total").increment(1);
                    }
                }
            }
        }

        snapshot
    }
}
