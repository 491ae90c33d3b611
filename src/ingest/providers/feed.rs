// src/ingest/providers/feed.rs
//! Syndication-feed provider: fetches an RSS document and maps its items to
//! normalized [`Article`]s. One instance per configured feed source.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::registry::FeedSpec;
use crate::ingest::types::{Article, SourceProvider};
use crate::ingest::{normalize_text, now_unix};

use super::{parse_published, MAX_ENTRIES_PER_SOURCE};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

pub struct FeedProvider {
    spec: FeedSpec,
    client: reqwest::Client,
}

impl FeedProvider {
    pub fn new(spec: FeedSpec, client: reqwest::Client) -> Self {
        Self { spec, client }
    }

    fn parse_items(&self, body: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing rss from `{}`", self.spec.name))?;

        let fetched_at = now_unix();
        let mut out = Vec::new();
        for it in rss.channel.item.into_iter().take(MAX_ENTRIES_PER_SOURCE) {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let description = normalize_text(it.description.as_deref().unwrap_or_default());

            out.push(Article {
                source: self.spec.name.clone(),
                title,
                description,
                published_at: it.pub_date.as_deref().map(parse_published).unwrap_or(0),
                source_weight: self.spec.weight,
                source_reliability: self.spec.reliability,
                fetched_at,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_articles_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for FeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let resp = self
            .client
            .get(&self.spec.url)
            .send()
            .await
            .with_context(|| format!("feed get `{}`", self.spec.name))?;
        let body = resp
            .error_for_status()
            .with_context(|| format!("feed status `{}`", self.spec.name))?
            .text()
            .await
            .with_context(|| format!("feed body `{}`", self.spec.name))?;
        self.parse_items(&body)
    }

    fn name(&self) -> &str {
        &self.spec.name
    }
}

/// quick-xml chokes on HTML entities RSS bodies love to carry; swap the
/// common ones for plain characters before deserializing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FeedSpec {
        FeedSpec {
            name: "TestWire".into(),
            url: "http://unused.invalid/rss".into(),
            weight: 0.8,
            reliability: 0.9,
        }
    }

    fn provider() -> FeedProvider {
        FeedProvider::new(spec(), reqwest::Client::new())
    }

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
<title>Test</title>
<item>
  <title>Dollar surges after Fed decision</title>
  <description>The greenback &ndash; buoyed by rate talk &ndash; rallied.</description>
  <pubDate>Mon, 02 Jan 2006 15:04:05 GMT</pubDate>
</item>
<item>
  <title></title>
  <description>no title, dropped</description>
</item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_drops_empty_titles() {
        let arts = provider().parse_items(SAMPLE).unwrap();
        assert_eq!(arts.len(), 1);
        let a = &arts[0];
        assert_eq!(a.source, "TestWire");
        assert_eq!(a.title, "Dollar surges after Fed decision");
        assert!(a.description.contains("rallied"));
        assert_eq!(a.published_at, 1_136_214_245);
        assert!((a.source_weight - 0.8).abs() < 1e-9);
    }

    #[test]
    fn entry_cap_applies() {
        let mut body = String::from(r#"<?xml version="1.0"?><rss><channel>"#);
        for i in 0..80 {
            body.push_str(&format!("<item><title>Headline {i}</title></item>"));
        }
        body.push_str("</channel></rss>");
        let arts = provider().parse_items(&body).unwrap();
        assert_eq!(arts.len(), MAX_ENTRIES_PER_SOURCE);
    }

    #[test]
    fn channel_without_items_is_empty_not_error() {
        let body = r#"<?xml version="1.0"?><rss><channel><title>t</title></channel></rss>"#;
        let arts = provider().parse_items(body).unwrap();
        assert!(arts.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(provider().parse_items("{\"not\": \"xml\"}").is_err());
    }
}
