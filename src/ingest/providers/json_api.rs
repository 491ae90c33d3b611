// src/ingest/providers/json_api.rs
//! JSON-API provider: fetches a JSON document carrying an array of article
//! objects and maps it through the source's field adapter. Field names per
//! source come from the registry, so one provider type covers every
//! JSON-shaped endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;

use crate::ingest::registry::JsonApiSpec;
use crate::ingest::types::{Article, SourceProvider};
use crate::ingest::{normalize_text, now_unix};

use super::{parse_published, MAX_ENTRIES_PER_SOURCE};

pub struct JsonApiProvider {
    spec: JsonApiSpec,
    client: reqwest::Client,
}

impl JsonApiProvider {
    pub fn new(spec: JsonApiSpec, client: reqwest::Client) -> Self {
        Self { spec, client }
    }

    fn map_payload(&self, payload: &Value) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let fields = &self.spec.fields;

        let entries = payload
            .get(&fields.articles)
            .and_then(Value::as_array)
            .with_context(|| {
                format!(
                    "`{}` payload has no `{}` array",
                    self.spec.name, fields.articles
                )
            })?;

        let fetched_at = now_unix();
        let mut out = Vec::new();
        for entry in entries.iter().take(MAX_ENTRIES_PER_SOURCE) {
            let title = normalize_text(str_field(entry, &fields.title).unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let description =
                normalize_text(str_field(entry, &fields.description).unwrap_or_default());
            let published_at = match entry.get(&fields.published) {
                Some(Value::String(s)) => parse_published(s),
                Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
                _ => 0,
            };

            out.push(Article {
                source: self.spec.name.clone(),
                title,
                description,
                published_at,
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

fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

#[async_trait]
impl SourceProvider for JsonApiProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let resp = self
            .client
            .get(&self.spec.url)
            .send()
            .await
            .with_context(|| format!("json-api get `{}`", self.spec.name))?;
        let payload: Value = resp
            .error_for_status()
            .with_context(|| format!("json-api status `{}`", self.spec.name))?
            .json()
            .await
            .with_context(|| format!("json-api body `{}`", self.spec.name))?;
        self.map_payload(&payload)
    }

    fn name(&self) -> &str {
        &self.spec.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::registry::FieldMap;
    use serde_json::json;

    fn provider(fields: FieldMap) -> JsonApiProvider {
        JsonApiProvider::new(
            JsonApiSpec {
                name: "Wire".into(),
                url: "http://unused.invalid/api".into(),
                weight: 0.9,
                reliability: 0.95,
                fields,
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn maps_default_shape() {
        let payload = json!({
            "articles": [
                {"title": "Euro plunges", "description": "ECB warns", "published_at": "2006-01-02T15:04:05Z"},
                {"title": "", "description": "dropped"},
            ]
        });
        let arts = provider(FieldMap::default()).map_payload(&payload).unwrap();
        assert_eq!(arts.len(), 1);
        assert_eq!(arts[0].title, "Euro plunges");
        assert_eq!(arts[0].published_at, 1_136_214_245);
    }

    #[test]
    fn maps_custom_field_names_and_numeric_timestamps() {
        let fields = FieldMap {
            articles: "items".into(),
            title: "headline".into(),
            description: "summary".into(),
            published: "ts".into(),
        };
        let payload = json!({
            "items": [ {"headline": "Pound gains", "summary": "BoE holds", "ts": 1136214245} ]
        });
        let arts = provider(fields).map_payload(&payload).unwrap();
        assert_eq!(arts.len(), 1);
        assert_eq!(arts[0].title, "Pound gains");
        assert_eq!(arts[0].published_at, 1_136_214_245);
    }

    #[test]
    fn missing_articles_array_is_an_error() {
        let payload = json!({"results": []});
        assert!(provider(FieldMap::default()).map_payload(&payload).is_err());
    }
}
