// src/market/exchange.rs
//! Client for the crypto exchange's 24-hour ticker endpoint. Best effort:
//! `connect` probes the exchange once and fails when it cannot be reached,
//! which the collector treats as a permanent degraded mode.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::InstrumentQuote;

// The ticker reports numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    price_change: String,
    price_change_percent: String,
    #[serde(default)]
    quote_volume: Option<String>,
}

pub struct ExchangeClient {
    base: String,
    client: reqwest::Client,
}

impl ExchangeClient {
    /// Build the client and probe the exchange's ping route once.
    pub async fn connect(base: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building exchange http client")?;
        let this = Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        };

        this.client
            .get(format!("{}/api/v3/ping", this.base))
            .send()
            .await
            .context("exchange ping")?
            .error_for_status()
            .context("exchange ping status")?;

        Ok(this)
    }

    pub async fn ticker(&self, pair: &str) -> Result<InstrumentQuote> {
        let url = format!("{}/api/v3/ticker/24hr", self.base);
        let t: Ticker24h = self
            .client
            .get(&url)
            .query(&[("symbol", pair)])
            .send()
            .await
            .with_context(|| format!("ticker get `{pair}`"))?
            .error_for_status()
            .with_context(|| format!("ticker status `{pair}`"))?
            .json()
            .await
            .with_context(|| format!("ticker body `{pair}`"))?;

        quote_from_ticker(&t, pair)
    }
}

fn quote_from_ticker(t: &Ticker24h, pair: &str) -> Result<InstrumentQuote> {
    let price = parse_num(&t.last_price, pair, "lastPrice")?;
    let change = parse_num(&t.price_change, pair, "priceChange")?;
    let change_pct = parse_num(&t.price_change_percent, pair, "priceChangePercent")?;
    let volume = match &t.quote_volume {
        Some(v) => Some(parse_num(v, pair, "quoteVolume")?),
        None => None,
    };
    Ok(InstrumentQuote {
        price,
        change,
        change_pct,
        volume,
    })
}

fn parse_num(s: &str, pair: &str, field: &str) -> Result<f64> {
    s.parse::<f64>()
        .with_context(|| format!("`{pair}`: bad {field} `{s}`"))
}
