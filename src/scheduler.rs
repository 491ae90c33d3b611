// src/scheduler.rs
//! # Scheduler
//! Drives the two scan pipelines on independent periodic timers and owns
//! the service facade read by the trading decision loop.
//!
//! Per cycle type the state machine is IDLE -> RUNNING -> IDLE with a
//! terminal STOPPED. A tick that lands while the previous run of the same
//! cycle is still in flight is skipped, never stacked; the opposing cycle
//! type runs freely in parallel. A failing or panicking cycle body is
//! logged and the next tick proceeds — nothing here is fatal to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use metrics::{counter, gauge};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::aggregator::{IntelStats, MarketIntelligence, SentimentTrend};
use crate::config::AppConfig;
use crate::ingest::types::{Article, ScoredArticle};
use crate::ingest::{dedup_articles, now_unix, registry, Fetcher, SeenCache};
use crate::market::MarketCollector;
use crate::relevance;
use crate::sentiment::SentimentAnalyzer;

/// Headlines remembered for cross-cycle dedup.
const SEEN_CACHE_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Idle,
    Running,
    Stopped,
}

/// Overlap guard plus terminal-stop flag for one cycle type.
#[derive(Debug, Default)]
pub struct CycleState {
    running: AtomicBool,
    stopped: AtomicBool,
}

impl CycleState {
    /// Attempt IDLE -> RUNNING. `false` when already running or stopped.
    fn try_begin(&self) -> bool {
        if self.stopped.load(Ordering::Acquire) {
            return false;
        }
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn phase(&self) -> CyclePhase {
        if self.stopped.load(Ordering::Acquire) {
            CyclePhase::Stopped
        } else if self.running.load(Ordering::Acquire) {
            CyclePhase::Running
        } else {
            CyclePhase::Idle
        }
    }
}

/// Score one article. Returns `None` for an article whose text is unusable,
/// which drops it from the cycle without failing the cycle.
pub fn score_article(analyzer: &SentimentAnalyzer, article: Article) -> Option<ScoredArticle> {
    let text = article.text();
    if text.trim().is_empty() {
        return None;
    }
    let relevance = relevance::score(&text);
    let sentiment = analyzer.score_text(&text);
    Some(ScoredArticle {
        article,
        relevance,
        sentiment,
    })
}

/// The market-intelligence service: owns the pipelines and the aggregate
/// state, and exposes the reads consumed by the trading decision loop.
pub struct IntelService {
    cfg: AppConfig,
    aggregator: Arc<MarketIntelligence>,
    fetcher: Arc<Fetcher>,
    collector: Arc<MarketCollector>,
    seen: Arc<SeenCache>,
    news_state: Arc<CycleState>,
    market_state: Arc<CycleState>,
    started: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl IntelService {
    /// Load the registry, build the fetcher, and probe the market clients.
    /// The only hard failure here is HTTP client construction.
    pub async fn connect(cfg: AppConfig) -> Result<Arc<Self>> {
        let specs = registry::load_or_seed(&cfg.sources_path);
        tracing::info!(sources = specs.len(), path = %cfg.sources_path, "source registry loaded");

        let fetcher = Fetcher::from_registry(
            &specs,
            Duration::from_secs(cfg.request_timeout_secs),
        )?;
        let collector = MarketCollector::connect(&cfg).await?;
        Ok(Self::from_parts(cfg, fetcher, collector))
    }

    /// Assemble from prebuilt parts (used by tests with mock endpoints).
    pub fn from_parts(cfg: AppConfig, fetcher: Fetcher, collector: MarketCollector) -> Arc<Self> {
        let capacity = cfg.history_capacity;
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            cfg,
            aggregator: Arc::new(MarketIntelligence::with_capacity(capacity)),
            fetcher: Arc::new(fetcher),
            collector: Arc::new(collector),
            seen: Arc::new(SeenCache::with_capacity(SEEN_CACHE_CAPACITY)),
            news_state: Arc::new(CycleState::default()),
            market_state: Arc::new(CycleState::default()),
            started: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Begin both cycle schedules. Idempotent: repeat calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        crate::ingest::ensure_metrics_described();
        tracing::info!(
            news_interval = self.cfg.news_interval_secs,
            market_interval = self.cfg.market_interval_secs,
            "starting scan cycles"
        );

        let news = self.clone();
        let news_task = tokio::spawn(async move {
            news.cycle_loop(
                "news",
                news.cfg.news_interval_secs,
                news.news_state.clone(),
                |svc| async move { svc.run_news_cycle().await },
            )
            .await;
        });

        let market = self.clone();
        let market_task = tokio::spawn(async move {
            market
                .cycle_loop(
                    "market",
                    market.cfg.market_interval_secs,
                    market.market_state.clone(),
                    |svc| async move { svc.run_market_cycle().await },
                )
                .await;
        });

        let mut tasks = self.tasks.lock().expect("task list mutex poisoned");
        tasks.push(news_task);
        tasks.push(market_task);
    }

    /// Halt scheduling. Idempotent. An in-flight cycle finishes on its own;
    /// no further ticks fire afterwards.
    pub fn stop(&self) {
        self.news_state.stop();
        self.market_state.stop();
        let _ = self.shutdown_tx.send(true);
        tracing::info!("scan cycles stopping");
    }

    /// Wait for both cycle loops to exit. Call after [`IntelService::stop`].
    pub async fn join_loops(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("task list mutex poisoned");
            tasks.drain(..).collect()
        };
        for h in handles {
            let _ = h.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire)
            && self.news_state.phase() != CyclePhase::Stopped
    }

    /// Public-scale sentiment, `[0,1]`, 0.5 neutral.
    pub fn current_sentiment(&self) -> f64 {
        self.aggregator.current_sentiment()
    }

    pub fn sentiment_trend(&self) -> SentimentTrend {
        self.aggregator.sentiment_trend()
    }

    pub fn get_stats(&self) -> IntelStats {
        self.aggregator.stats(
            self.is_running(),
            self.seen.len(),
            self.fetcher.source_count(),
        )
    }

    pub fn aggregator(&self) -> &Arc<MarketIntelligence> {
        &self.aggregator
    }

    /// (news, market) scheduler phases. Diagnostics only.
    pub fn cycle_phases(&self) -> (CyclePhase, CyclePhase) {
        (self.news_state.phase(), self.market_state.phase())
    }

    async fn cycle_loop<F, Fut>(
        self: &Arc<Self>,
        kind: &'static str,
        interval_secs: u64,
        state: Arc<CycleState>,
        body: F,
    ) where
        F: Fn(Arc<Self>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {}
            }
            if *shutdown.borrow() || state.phase() == CyclePhase::Stopped {
                break;
            }
            if !state.try_begin() {
                tracing::warn!(target: "scheduler", cycle = kind, "previous run still in flight; tick skipped");
                counter!("cycles_skipped_total").increment(1);
                continue;
            }

            // Run the body on its own task so a panic inside one cycle is
            // contained and the schedule survives it.
            let handle = tokio::spawn(body(self.clone()));
            if let Err(e) = handle.await {
                tracing::error!(target: "scheduler", cycle = kind, error = ?e, "cycle body aborted");
            }
            state.finish();
        }
        tracing::info!(target: "scheduler", cycle = kind, "cycle loop stopped");
    }

    async fn run_news_cycle(self: Arc<Self>) {
        let (articles, sources_ok) = self.fetcher.fetch_all().await;
        let fetched = articles.len();
        let (fresh, deduped) = dedup_articles(&self.seen, articles);

        let analyzer = SentimentAnalyzer::new();
        let scored: Vec<ScoredArticle> = fresh
            .into_iter()
            .filter_map(|a| score_article(&analyzer, a))
            .collect();

        let sample = self.aggregator.record_news_cycle(&scored, sources_ok);
        counter!("news_cycles_total").increment(1);
        gauge!("news_cycle_last_run_ts").set(now_unix() as f64);
        tracing::info!(
            target: "scheduler",
            fetched,
            deduped,
            scored = scored.len(),
            sources_ok,
            sentiment = sample.sentiment,
            "news cycle complete"
        );
    }

    async fn run_market_cycle(self: Arc<Self>) {
        let snapshot = self.collector.collect().await;
        let instruments = snapshot.len();
        self.aggregator.record_market_cycle(snapshot);
        counter!("market_cycles_total").increment(1);
        gauge!("market_cycle_last_run_ts").set(now_unix() as f64);
        tracing::info!(target: "scheduler", instruments, "market cycle complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_state_guards_reentry() {
        let st = CycleState::default();
        assert_eq!(st.phase(), CyclePhase::Idle);
        assert!(st.try_begin());
        assert_eq!(st.phase(), CyclePhase::Running);
        assert!(!st.try_begin(), "overlapping begin must be rejected");
        st.finish();
        assert_eq!(st.phase(), CyclePhase::Idle);
        assert!(st.try_begin());
    }

    #[test]
    fn stopped_is_terminal() {
        let st = CycleState::default();
        st.stop();
        assert_eq!(st.phase(), CyclePhase::Stopped);
        assert!(!st.try_begin());
        // finish() after stop must not resurrect the cycle.
        st.finish();
        assert_eq!(st.phase(), CyclePhase::Stopped);
    }

    #[test]
    fn score_article_drops_empty_text() {
        let analyzer = SentimentAnalyzer::new();
        let article = Article {
            source: "T".into(),
            title: "   ".into(),
            description: String::new(),
            published_at: 0,
            source_weight: 0.5,
            source_reliability: 0.5,
            fetched_at: 0,
        };
        assert!(score_article(&analyzer, article).is_none());
    }

    #[test]
    fn score_article_scores_real_text() {
        let analyzer = SentimentAnalyzer::new();
        let article = Article {
            source: "T".into(),
            title: "Fed raises interest rates, dollar surges to record high".into(),
            description: String::new(),
            published_at: 0,
            source_weight: 0.9,
            source_reliability: 0.9,
            fetched_at: 0,
        };
        let scored = score_article(&analyzer, article).unwrap();
        assert!(scored.relevance > 0.3);
        assert!(scored.sentiment > 0.3);
    }
}
