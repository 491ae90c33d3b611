// src/ingest/mod.rs
//! # News ingest
//! Fetches every configured source once per scan cycle, normalizes the
//! responses into [`types::Article`] records, and deduplicates headlines
//! against a bounded cache of recently seen items.
//!
//! Fetches fan out as tasks and are collected as they finish, so one slow
//! source never serializes the others; a failing source is logged, counted,
//! and contributes zero articles for the cycle.

pub mod providers;
pub mod registry;
pub mod types;

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use self::providers::{feed::FeedProvider, json_api::JsonApiProvider};
use self::registry::SourceSpec;
use self::types::{Article, SourceProvider};

const USER_AGENT: &str = concat!("fx-sentiment-aggregator/", env!("CARGO_PKG_VERSION"));

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_articles_total",
            "Articles parsed from source payloads."
        );
        describe_counter!(
            "ingest_kept_total",
            "Articles kept after normalization and dedup."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Articles dropped as duplicates of recently seen headlines."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse failures."
        );
        describe_counter!("news_cycles_total", "Completed news scan cycles.");
        describe_counter!("market_cycles_total", "Completed market scan cycles.");
        describe_counter!(
            "cycles_skipped_total",
            "Cycle ticks skipped because the previous run was still in flight."
        );
        describe_histogram!("ingest_parse_ms", "Source payload parse time in milliseconds.");
        describe_gauge!("news_cycle_last_run_ts", "Unix ts of the last news cycle.");
        describe_gauge!("market_cycle_last_run_ts", "Unix ts of the last market cycle.");
    });
}

/// Current UNIX time in seconds.
pub fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Normalize text: decode HTML entities, strip tags, collapse whitespace,
/// trim stray punctuation, cap the length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Owns one provider per configured source plus the shared HTTP client.
pub struct Fetcher {
    providers: Vec<Arc<dyn SourceProvider>>,
}

impl Fetcher {
    /// Build providers for every registry entry. The only fallible step is
    /// constructing the HTTP client, which is a startup precondition.
    pub fn from_registry(specs: &[SourceSpec], request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("building ingest http client")?;

        let providers = specs
            .iter()
            .map(|spec| -> Arc<dyn SourceProvider> {
                match spec {
                    SourceSpec::Feed(s) => Arc::new(FeedProvider::new(s.clone(), client.clone())),
                    SourceSpec::JsonApi(s) => {
                        Arc::new(JsonApiProvider::new(s.clone(), client.clone()))
                    }
                }
            })
            .collect();

        Ok(Self { providers })
    }

    /// Assemble from prebuilt providers (tests, custom wiring).
    pub fn from_providers(providers: Vec<Arc<dyn SourceProvider>>) -> Self {
        Self { providers }
    }

    pub fn source_count(&self) -> usize {
        self.providers.len()
    }

    /// One fetch attempt per source: all requests are issued before any is
    /// awaited, and results are folded in completion order. Returns the flat
    /// article list plus the number of sources that responded successfully.
    /// An empty list is a valid result.
    pub async fn fetch_all(&self) -> (Vec<Article>, usize) {
        ensure_metrics_described();

        let mut set = JoinSet::new();
        for p in &self.providers {
            let p = Arc::clone(p);
            set.spawn(async move {
                let name = p.name().to_string();
                (name, p.fetch_latest().await)
            });
        }

        let mut all = Vec::new();
        let mut sources_ok = 0usize;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(mut articles))) => {
                    sources_ok += 1;
                    all.append(&mut articles);
                }
                Ok((name, Err(e))) => {
                    tracing::warn!(target: "ingest", error = ?e, source = %name, "source fetch failed");
                    counter!("ingest_provider_errors_total").increment(1);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, "fetch task panicked");
                    counter!("ingest_provider_errors_total").increment(1);
                }
            }
        }

        (all, sources_ok)
    }
}

/* ----------------------------
Seen-headline cache
---------------------------- */

/// Near-duplicate threshold for `strsim::normalized_levenshtein`.
const NEAR_DUP_SIMILARITY: f64 = 0.90;

/// Bounded cache of recently seen headlines, shared across cycles. Admits a
/// headline once; exact repeats and near-identical rewordings are dropped.
/// Oldest entries are evicted when full.
#[derive(Debug)]
pub struct SeenCache {
    inner: Mutex<SeenInner>,
    cap: usize,
}

#[derive(Debug)]
struct SeenInner {
    order: VecDeque<String>,
    exact: HashSet<String>,
}

impl SeenCache {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(SeenInner {
                order: VecDeque::with_capacity(cap),
                exact: HashSet::with_capacity(cap),
            }),
            cap: cap.max(1),
        }
    }

    /// Returns `true` if the headline is new (and records it), `false` if it
    /// duplicates a cached one.
    pub fn admit(&self, title: &str) -> bool {
        let key = title.trim().to_lowercase();
        if key.is_empty() {
            return false;
        }

        let mut inner = self.inner.lock().expect("seen cache mutex poisoned");
        if inner.exact.contains(&key) {
            return false;
        }
        if inner
            .order
            .iter()
            .any(|seen| strsim::normalized_levenshtein(seen, &key) >= NEAR_DUP_SIMILARITY)
        {
            return false;
        }

        if inner.order.len() == self.cap {
            if let Some(old) = inner.order.pop_front() {
                inner.exact.remove(&old);
            }
        }
        inner.order.push_back(key.clone());
        inner.exact.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("seen cache mutex poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop articles whose headline the cache has already admitted.
/// Returns (kept, dropped_count).
pub fn dedup_articles(cache: &SeenCache, articles: Vec<Article>) -> (Vec<Article>, usize) {
    let total = articles.len();
    let kept: Vec<Article> = articles
        .into_iter()
        .filter(|a| cache.admit(&a.title))
        .collect();
    let dropped = total - kept.len();
    counter!("ingest_kept_total").increment(kept.len() as u64);
    counter!("ingest_dedup_total").increment(dropped as u64);
    (kept, dropped)
}
