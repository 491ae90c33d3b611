// src/market/candles.rs
//! Client for the OHLC candles endpoint. Only the two most recent bars are
//! requested: the latest close is the price, the previous close anchors the
//! change, and the latest bar's volume rides along when present.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::InstrumentQuote;

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<Candle>,
}

#[derive(Debug, Deserialize)]
struct Candle {
    #[serde(default)]
    volume: Option<f64>,
    mid: MidPrices,
}

// Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct MidPrices {
    c: String,
}

pub struct CandlesClient {
    base: String,
    token: String,
    client: reqwest::Client,
}

impl CandlesClient {
    pub fn new(base: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building candles http client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    pub async fn latest_quote(&self, instrument: &str) -> Result<InstrumentQuote> {
        let url = format!("{}/v3/instruments/{}/candles", self.base, instrument);
        let resp: CandlesResponse = self
            .client
            .get(&url)
            .query(&[("granularity", "M1"), ("count", "2")])
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("candles get `{instrument}`"))?
            .error_for_status()
            .with_context(|| format!("candles status `{instrument}`"))?
            .json()
            .await
            .with_context(|| format!("candles body `{instrument}`"))?;

        quote_from_bars(&resp, instrument)
    }
}

fn quote_from_bars(resp: &CandlesResponse, instrument: &str) -> Result<InstrumentQuote> {
    let n = resp.candles.len();
    if n < 2 {
        anyhow::bail!("`{instrument}`: need 2 bars, got {n}");
    }
    let prev_close = parse_price(&resp.candles[n - 2].mid.c, instrument)?;
    let last = &resp.candles[n - 1];
    let last_close = parse_price(&last.mid.c, instrument)?;
    if prev_close <= 0.0 {
        anyhow::bail!("`{instrument}`: non-positive previous close {prev_close}");
    }

    let change = last_close - prev_close;
    Ok(InstrumentQuote {
        price: last_close,
        change,
        change_pct: change / prev_close * 100.0,
        volume: last.volume,
    })
}

fn parse_price(s: &str, instrument: &str) -> Result<f64> {
    s.parse::<f64>()
        .with_context(|| format!("`{instrument}`: bad price `{s}`"))
}
