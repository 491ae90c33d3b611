// src/aggregator.rs
//! # Market Intelligence Aggregator
//!
//! Rolling in-memory state fed by the two scan cycles and read by the
//! trading decision loop. One mutex guards everything: a completed cycle
//! appends a whole sample atomically, and readers see either the pre- or
//! post-update state, never a torn one.
//!
//! Scale conventions (applied uniformly, converted in exactly one place):
//! - article and sample sentiment are internal, `[-1,1]`, 0 neutral;
//! - `current_sentiment()` is the public read, `[0,1]`, 0.5 neutral.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

use crate::config::{RECENT_SAMPLE_WINDOW, TREND_MIN_SAMPLES, TREND_WINDOW};
use crate::ingest::now_unix;
use crate::ingest::types::ScoredArticle;
use crate::market::MarketSnapshot;

/// Regression slope (per sample) above which the trend counts as moving.
const TREND_SLOPE_THRESHOLD: f64 = 0.005;

/// Share of the blended sentiment contributed by the market component
/// when a market sentiment value exists.
const MARKET_BLEND_WEIGHT: f64 = 0.3;

/// Percent change that maps to a full-scale market sentiment of ±1.
const MARKET_FULL_SCALE_PCT: f64 = 2.0;

/// One completed news cycle, folded into the rolling buffer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SentimentSample {
    pub ts_unix: u64,
    /// Weighted mean article sentiment, `[-1,1]`.
    pub sentiment: f64,
    pub article_count: usize,
    pub sources_scanned: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentTrend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
    /// Wire-level fallback when the aggregate state cannot be read.
    #[default]
    Unknown,
}

/// Market-side debug view served by `/debug/market`.
#[derive(Debug, Clone, Serialize)]
pub struct MarketDebug {
    /// Internal scale, `[-1,1]`.
    pub market_sentiment: Option<f64>,
    pub last_news_cycle_ts: Option<u64>,
    pub last_market_cycle_ts: Option<u64>,
    pub last_snapshot: Option<MarketSnapshot>,
}

/// Diagnostic snapshot served by `/stats`. Not used for control decisions.
#[derive(Debug, Clone, Serialize)]
pub struct IntelStats {
    pub running: bool,
    pub news_cycles_run: u64,
    pub market_cycles_run: u64,
    pub history_length: usize,
    pub cache_length: usize,
    /// Public-scale sentiment, `[0,1]`.
    pub current_sentiment: f64,
    pub configured_source_count: usize,
}

#[derive(Debug)]
struct Inner {
    samples: VecDeque<SentimentSample>,
    /// Latest market-derived sentiment, internal scale. `None` until a
    /// non-empty market snapshot has been recorded.
    market_sentiment: Option<f64>,
    /// Most recent snapshot, kept for diagnostics only.
    last_snapshot: Option<MarketSnapshot>,
    news_cycles_run: u64,
    market_cycles_run: u64,
    last_news_cycle_ts: Option<u64>,
    last_market_cycle_ts: Option<u64>,
}

/// Process-lifetime aggregate state. Multiple producers (the two cycles),
/// any number of readers.
#[derive(Debug)]
pub struct MarketIntelligence {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MarketIntelligence {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                samples: VecDeque::with_capacity(capacity.min(4096)),
                market_sentiment: None,
                last_snapshot: None,
                news_cycles_run: 0,
                market_cycles_run: 0,
                last_news_cycle_ts: None,
                last_market_cycle_ts: None,
            }),
            capacity: capacity.max(1),
        }
    }

    /// Fold one completed news cycle into the buffer. Every article's
    /// sentiment is weighted by (relevance x source weight); an empty cycle
    /// produces the neutral default sample rather than failing.
    pub fn record_news_cycle(
        &self,
        articles: &[ScoredArticle],
        sources_scanned: usize,
    ) -> SentimentSample {
        let mut weighted_sum = 0.0f64;
        let mut weight_total = 0.0f64;
        for a in articles {
            let w = a.relevance * a.article.source_weight;
            weighted_sum += a.sentiment * w;
            weight_total += w;
        }
        let sentiment = if weight_total > 0.0 {
            (weighted_sum / weight_total).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let sample = SentimentSample {
            ts_unix: now_unix(),
            sentiment,
            article_count: articles.len(),
            sources_scanned,
        };

        let mut inner = self.inner.lock().expect("aggregate mutex poisoned");
        if inner.samples.len() == self.capacity {
            inner.samples.pop_front();
        }
        inner.samples.push_back(sample.clone());
        inner.news_cycles_run += 1;
        inner.last_news_cycle_ts = Some(sample.ts_unix);
        sample
    }

    /// Fold one completed market cycle. The snapshot is reduced to a
    /// direction-aware scalar: signed percent changes across all
    /// instruments, averaged, scaled, clamped. Only the latest value is
    /// kept. An empty snapshot clears the market component instead of
    /// letting a stale value linger.
    pub fn record_market_cycle(&self, snapshot: MarketSnapshot) {
        let sentiment = derive_market_sentiment(&snapshot);

        let mut inner = self.inner.lock().expect("aggregate mutex poisoned");
        inner.market_sentiment = sentiment;
        inner.market_cycles_run += 1;
        inner.last_market_cycle_ts = Some(snapshot.ts_unix);
        inner.last_snapshot = Some(snapshot);
    }

    /// Public sentiment read, `[0,1]` with 0.5 neutral.
    ///
    /// Recency-weighted average of the most recent samples (weights
    /// strictly increasing toward the newest), blended 70/30 with the
    /// latest market sentiment when one exists, then mapped from the
    /// internal scale. Returns the neutral 0.5 before any data arrives.
    pub fn current_sentiment(&self) -> f64 {
        let Ok(inner) = self.inner.lock() else {
            return 0.5;
        };

        let news = recency_weighted_mean(&inner.samples, RECENT_SAMPLE_WINDOW);
        let blended = match inner.market_sentiment {
            Some(m) => news * (1.0 - MARKET_BLEND_WEIGHT) + m * MARKET_BLEND_WEIGHT,
            None => news,
        };
        ((blended + 1.0) / 2.0).clamp(0.0, 1.0)
    }

    /// Coarse direction of the recent sample series: least-squares slope
    /// over the last [`TREND_WINDOW`] samples.
    pub fn sentiment_trend(&self) -> SentimentTrend {
        let Ok(inner) = self.inner.lock() else {
            return SentimentTrend::Unknown;
        };

        let len = inner.samples.len();
        if len < TREND_MIN_SAMPLES {
            return SentimentTrend::InsufficientData;
        }

        let start = len.saturating_sub(TREND_WINDOW);
        let recent: Vec<f64> = inner
            .samples
            .iter()
            .skip(start)
            .map(|s| s.sentiment)
            .collect();

        let slope = regression_slope(&recent);
        if slope > TREND_SLOPE_THRESHOLD {
            SentimentTrend::Improving
        } else if slope < -TREND_SLOPE_THRESHOLD {
            SentimentTrend::Declining
        } else {
            SentimentTrend::Stable
        }
    }

    /// Diagnostic snapshot; `running`, `cache_length` and the source count
    /// live outside the aggregate state and are passed in by the caller.
    pub fn stats(
        &self,
        running: bool,
        cache_length: usize,
        configured_source_count: usize,
    ) -> IntelStats {
        let current_sentiment = self.current_sentiment();
        let inner = self.inner.lock().expect("aggregate mutex poisoned");
        IntelStats {
            running,
            news_cycles_run: inner.news_cycles_run,
            market_cycles_run: inner.market_cycles_run,
            history_length: inner.samples.len(),
            cache_length,
            current_sentiment,
            configured_source_count,
        }
    }

    /// Latest market snapshot and per-cycle timestamps. Diagnostics only.
    pub fn market_debug(&self) -> MarketDebug {
        let inner = self.inner.lock().expect("aggregate mutex poisoned");
        MarketDebug {
            market_sentiment: inner.market_sentiment,
            last_news_cycle_ts: inner.last_news_cycle_ts,
            last_market_cycle_ts: inner.last_market_cycle_ts,
            last_snapshot: inner.last_snapshot.clone(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.inner
            .lock()
            .expect("aggregate mutex poisoned")
            .samples
            .len()
    }

    /// Last `n` samples, newest last. Diagnostics only.
    pub fn recent_samples(&self, n: usize) -> Vec<SentimentSample> {
        let inner = self.inner.lock().expect("aggregate mutex poisoned");
        let len = inner.samples.len();
        inner
            .samples
            .iter()
            .skip(len.saturating_sub(n))
            .cloned()
            .collect()
    }
}

/// Weighted mean of the last `window` samples with linearly increasing
/// weights (oldest-in-window gets 1, newest gets `window`). Empty input
/// yields the internal neutral 0.
fn recency_weighted_mean(samples: &VecDeque<SentimentSample>, window: usize) -> f64 {
    let len = samples.len();
    if len == 0 {
        return 0.0;
    }
    let start = len.saturating_sub(window);
    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;
    for (i, s) in samples.iter().skip(start).enumerate() {
        let w = (i + 1) as f64;
        weighted_sum += s.sentiment * w;
        weight_total += w;
    }
    weighted_sum / weight_total
}

/// Least-squares slope of `values` over their indices.
fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let mut num = 0.0f64;
    let mut denom = 0.0f64;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        denom += dx * dx;
    }
    if denom == 0.0 {
        0.0
    } else {
        num / denom
    }
}

/// Signed percent changes across all snapshot instruments, averaged and
/// scaled so a ±[`MARKET_FULL_SCALE_PCT`]% mean move saturates at ±1.
/// `None` for an empty snapshot.
fn derive_market_sentiment(snapshot: &MarketSnapshot) -> Option<f64> {
    let changes: Vec<f64> = snapshot.percent_changes().collect();
    if changes.is_empty() {
        return None;
    }
    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    Some((mean / MARKET_FULL_SCALE_PCT).clamp(-1.0, 1.0))
}
