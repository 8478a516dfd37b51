//! civiq-is library interface
//!
//! Exposes router construction and application state for the binary and
//! for integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use classify::gemini::GeminiClient;
use classify::ClassificationService;
use civiq_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Classification pipeline (AI-enriched or deterministic)
    pub classifier: Arc<ClassificationService>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last absorbed error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// Build application state
    ///
    /// `gemini_api_key = None` runs the classifier in pure deterministic
    /// mode; this is a supported configuration, not a degraded one.
    pub fn new(db: SqlitePool, event_bus: EventBus, gemini_api_key: Option<String>) -> Self {
        let last_error = Arc::new(RwLock::new(None));
        let gemini = gemini_api_key.map(GeminiClient::new);
        let classifier = Arc::new(ClassificationService::new(
            db.clone(),
            gemini,
            event_bus.clone(),
            last_error.clone(),
        ));

        Self {
            db,
            event_bus,
            classifier,
            startup_time: Utc::now(),
            last_error,
        }
    }
}

/// Build application router
///
/// CORS is fully permissive: the classify and vote endpoints are called
/// directly from browser clients on other origins.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::issue_routes())
        .merge(api::classify_routes())
        .merge(api::vote_routes())
        .merge(api::stats_routes())
        .merge(api::profile_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .route("/api/events", get(api::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
