// src/ingest/registry.rs
//! # Source Registry
//!
//! Static list of configured news sources. Loaded once at startup from a
//! TOML file; falls back to a built-in seed when the file is missing or
//! malformed. Never mutated after load.
//!
//! Each source is a tagged variant over {feed, json-api}. JSON-API sources
//! carry a field map so source-specific payload shapes are adapted here,
//! at load time, rather than sniffed per response.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Field names inside a JSON-API payload. Defaults match the common
/// `{"articles": [{"title", "description", "published_at"}]}` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
    #[serde(default = "default_articles_field")]
    pub articles: String,
    #[serde(default = "default_title_field")]
    pub title: String,
    #[serde(default = "default_description_field")]
    pub description: String,
    #[serde(default = "default_published_field")]
    pub published: String,
}

fn default_articles_field() -> String {
    "articles".into()
}
fn default_title_field() -> String {
    "title".into()
}
fn default_description_field() -> String {
    "description".into()
}
fn default_published_field() -> String {
    "published_at".into()
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            articles: default_articles_field(),
            title: default_title_field(),
            description: default_description_field(),
            published: default_published_field(),
        }
    }
}

/// One configured source, with the format decided at load time.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    Feed(FeedSpec),
    JsonApi(JsonApiSpec),
}

#[derive(Debug, Clone)]
pub struct FeedSpec {
    pub name: String,
    pub url: String,
    pub weight: f64,
    pub reliability: f64,
}

#[derive(Debug, Clone)]
pub struct JsonApiSpec {
    pub name: String,
    pub url: String,
    pub weight: f64,
    pub reliability: f64,
    pub fields: FieldMap,
}

impl SourceSpec {
    pub fn name(&self) -> &str {
        match self {
            SourceSpec::Feed(s) => &s.name,
            SourceSpec::JsonApi(s) => &s.name,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            SourceSpec::Feed(s) => s.weight,
            SourceSpec::JsonApi(s) => s.weight,
        }
    }

    pub fn reliability(&self) -> f64 {
        match self {
            SourceSpec::Feed(s) => s.reliability,
            SourceSpec::JsonApi(s) => s.reliability,
        }
    }
}

/* ----------------------------
TOML schema
---------------------------- */

#[derive(Debug, Deserialize)]
struct RegistryRoot {
    #[serde(rename = "source", alias = "sources")]
    sources: Vec<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: String,
    url: String,
    format: String, // "feed" | "json-api"
    weight: f64,
    reliability: f64,
    #[serde(default)]
    fields: Option<FieldMap>,
}

/// Parse a registry from a TOML string.
pub fn from_toml_str(toml_str: &str) -> Result<Vec<SourceSpec>> {
    let root: RegistryRoot = toml::from_str(toml_str).context("parsing sources toml")?;
    let mut out = Vec::with_capacity(root.sources.len());
    for raw in root.sources {
        let weight = clamp01(raw.weight);
        let reliability = clamp01(raw.reliability);
        let spec = match raw.format.to_ascii_lowercase().as_str() {
            "feed" | "rss" => SourceSpec::Feed(FeedSpec {
                name: raw.name,
                url: raw.url,
                weight,
                reliability,
            }),
            "json-api" | "json" => SourceSpec::JsonApi(JsonApiSpec {
                name: raw.name,
                url: raw.url,
                weight,
                reliability,
                fields: raw.fields.unwrap_or_default(),
            }),
            other => anyhow::bail!("source `{}` has unknown format `{}`", raw.name, other),
        };
        out.push(spec);
    }
    Ok(out)
}

/// Load from a TOML file, falling back to `default_seed()` when the file is
/// missing or does not parse. A bad registry file degrades to the seed, it
/// never stops the process.
pub fn load_or_seed<P: AsRef<Path>>(path: P) -> Vec<SourceSpec> {
    match fs::read_to_string(&path) {
        Ok(s) => match from_toml_str(&s) {
            Ok(v) if !v.is_empty() => v,
            Ok(_) => {
                tracing::warn!(path = %path.as_ref().display(), "sources file is empty; using seed");
                default_seed()
            }
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.as_ref().display(), "bad sources file; using seed");
                default_seed()
            }
        },
        Err(_) => default_seed(),
    }
}

/// Built-in registry used when no config file is present.
pub fn default_seed() -> Vec<SourceSpec> {
    vec![
        SourceSpec::Feed(FeedSpec {
            name: "MarketWatch".into(),
            url: "https://www.marketwatch.com/rss/realtimeheadlines".into(),
            weight: 0.8,
            reliability: 0.85,
        }),
        SourceSpec::Feed(FeedSpec {
            name: "Yahoo Finance".into(),
            url: "https://finance.yahoo.com/rss/headline".into(),
            weight: 0.7,
            reliability: 0.75,
        }),
        SourceSpec::JsonApi(JsonApiSpec {
            name: "Reuters".into(),
            url: "https://www.reutersagency.com/feed/?best-topics=business-finance&post_type=best"
                .into(),
            weight: 0.9,
            reliability: 0.95,
            fields: FieldMap::default(),
        }),
        SourceSpec::Feed(FeedSpec {
            name: "Bloomberg".into(),
            url: "https://feeds.bloomberg.com/markets/news.rss".into(),
            weight: 0.9,
            reliability: 0.95,
        }),
        SourceSpec::Feed(FeedSpec {
            name: "Financial Times".into(),
            url: "https://www.ft.com/rss/home".into(),
            weight: 0.8,
            reliability: 0.9,
        }),
    ]
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}
