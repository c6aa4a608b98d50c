//! hhv-review library - dataset validation service
//!
//! Serves unvalidated rows to reviewers one at a time and records their
//! validated results exactly once per row id.

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use hhv_common::config::{DataPaths, FolderLayout};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod review;
pub mod selector;
pub mod sink;
pub mod store;

pub use crate::engine::{RowFetch, ValidationEngine};
pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Engine owning the round-robin cursors; one per process
    pub engine: Arc<ValidationEngine>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(paths: DataPaths, folders: FolderLayout) -> Self {
        Self {
            engine: Arc::new(ValidationEngine::new(paths, folders)),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::row_routes())
        .merge(api::progress_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
