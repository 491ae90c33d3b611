// src/ingest/types.rs
use anyhow::Result;

/// One normalized news item, produced by a provider during a scan cycle.
/// Transient: scored immediately, never persisted beyond the dedup cache.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub description: String,
    /// Publication time, unix seconds (0 when the feed omits or mangles it).
    pub published_at: u64,
    /// Trust weight of the originating source, `[0,1]`.
    pub source_weight: f64,
    /// Reliability of the originating source, `[0,1]`.
    pub source_reliability: f64,
    /// When this process fetched the item, unix seconds.
    pub fetched_at: u64,
}

impl Article {
    /// Title and description joined for scoring.
    pub fn text(&self) -> String {
        if self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, self.description)
        }
    }
}

/// An article plus its heuristic scores.
#[derive(Debug, Clone)]
pub struct ScoredArticle {
    pub article: Article,
    /// Forex relevance, `[0,1]`.
    pub relevance: f64,
    /// Blended sentiment, `[-1,1]`.
    pub sentiment: f64,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
