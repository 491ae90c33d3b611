// tests/api_http.rs
use std::time::Duration;

use axum::body::Body;
use http::Request;
use tower::ServiceExt;

use fx_sentiment_aggregator::ingest::{registry, Fetcher};
use fx_sentiment_aggregator::market::MarketCollector;
use fx_sentiment_aggregator::{create_router, AppConfig, IntelService};

fn idle_service() -> std::sync::Arc<IntelService> {
    let cfg = AppConfig::default();
    let fetcher =
        Fetcher::from_registry(&registry::default_seed(), Duration::from_secs(1)).unwrap();
    let collector = MarketCollector::from_clients(None, None, Vec::new(), Vec::new());
    IntelService::from_parts(cfg, fetcher, collector)
}

async fn get_json(app: axum::Router, uri: &str) -> serde_json::Value {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.status().is_success(), "GET {uri} should be 2xx");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let app = create_router(idle_service());
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn stats_reflect_an_idle_service() {
    let app = create_router(idle_service());
    let v = get_json(app, "/stats").await;
    assert_eq!(v["running"], false);
    assert_eq!(v["news_cycles_run"], 0);
    assert_eq!(v["market_cycles_run"], 0);
    assert_eq!(v["history_length"], 0);
    assert_eq!(v["cache_length"], 0);
    assert_eq!(v["configured_source_count"], 5);
    assert_eq!(v["current_sentiment"], 0.5);
}

#[tokio::test]
async fn sentiment_route_reports_neutral_and_insufficient_data() {
    let app = create_router(idle_service());
    let v = get_json(app, "/sentiment").await;
    assert_eq!(v["sentiment"], 0.5);
    assert_eq!(v["trend"], "INSUFFICIENT_DATA");
}

#[tokio::test]
async fn debug_market_route_renders_idle_state() {
    let app = create_router(idle_service());
    let v = get_json(app, "/debug/market").await;
    assert_eq!(v["news_phase"], "IDLE");
    assert_eq!(v["market_phase"], "IDLE");
    assert!(v["market_sentiment"].is_null());
    assert!(v["last_snapshot"].is_null());
}

#[tokio::test]
async fn sentiment_route_tracks_recorded_cycles() {
    let service = idle_service();
    for i in 0..20 {
        let s = -0.5 + i as f64 / 19.0;
        service.aggregator().record_news_cycle(
            &[fx_sentiment_aggregator::ingest::types::ScoredArticle {
                article: fx_sentiment_aggregator::ingest::types::Article {
                    source: "T".into(),
                    title: format!("headline {i}"),
                    description: String::new(),
                    published_at: 0,
                    source_weight: 1.0,
                    source_reliability: 1.0,
                    fetched_at: 0,
                },
                relevance: 1.0,
                sentiment: s,
            }],
            1,
        );
    }

    let app = create_router(service);
    let v = get_json(app, "/sentiment").await;
    assert_eq!(v["trend"], "IMPROVING");
    let s = v["sentiment"].as_f64().unwrap();
    assert!(s > 0.5, "ramp toward positive must read above neutral: {s}");
}
