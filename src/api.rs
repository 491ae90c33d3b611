// src/api.rs
//! Diagnostic HTTP surface. Read-only: health probe, stats snapshot, and
//! the current sentiment/trend pair. Control decisions never flow through
//! here — collaborators consume the library surface directly.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tower_http::cors::CorsLayer;

use crate::aggregator::{IntelStats, MarketDebug, SentimentTrend};
use crate::scheduler::{CyclePhase, IntelService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IntelService>,
}

pub fn create_router(service: Arc<IntelService>) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats))
        .route("/sentiment", get(sentiment))
        .route("/debug/market", get(debug_market))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn stats(State(state): State<AppState>) -> Json<IntelStats> {
    Json(state.service.get_stats())
}

#[derive(serde::Serialize)]
struct SentimentResp {
    /// Public scale: `[0,1]`, 0.5 neutral.
    sentiment: f64,
    trend: SentimentTrend,
}

async fn sentiment(State(state): State<AppState>) -> Json<SentimentResp> {
    Json(SentimentResp {
        sentiment: state.service.current_sentiment(),
        trend: state.service.sentiment_trend(),
    })
}

#[derive(serde::Serialize)]
struct DebugMarketResp {
    news_phase: CyclePhase,
    market_phase: CyclePhase,
    #[serde(flatten)]
    market: MarketDebug,
}

async fn debug_market(State(state): State<AppState>) -> Json<DebugMarketResp> {
    let (news_phase, market_phase) = state.service.cycle_phases();
    Json(DebugMarketResp {
        news_phase,
        market_phase,
        market: state.service.aggregator().market_debug(),
    })
}
