use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::cache::{CacheStats, SentStore};
use crate::config::UserProfile;
use crate::curate::DigestContent;
use crate::pipeline::{Pipeline, RunReport};

#[derive(Clone)]
pub struct AppState {
    pub profile: Arc<UserProfile>,
    pub store: Arc<Mutex<SentStore>>,
    pub pipeline: Arc<Pipeline>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/digest/preview", get(preview))
        .route("/digest/run", post(run))
        .route("/cache/stats", get(cache_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct HealthResp {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResp> {
    Json(HealthResp {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn preview(
    State(state): State<AppState>,
) -> Result<Json<Option<DigestContent>>, (StatusCode, String)> {
    let store = state.store.lock().await;
    state
        .pipeline
        .preview(&state.profile, &store)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn run(State(state): State<AppState>) -> Result<Json<RunReport>, (StatusCode, String)> {
    // The store mutex serializes runs: single writer, as the cache assumes.
    let mut store = state.store.lock().await;
    state
        .pipeline
        .run(&state.profile, &mut store)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    let store = state.store.lock().await;
    Json(store.stats())
}

fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
}
