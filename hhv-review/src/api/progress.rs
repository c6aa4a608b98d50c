//! Review progress endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use hhv_common::ReviewerCategory;
use serde::Serialize;

use super::CategoryQuery;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    #[serde(rename = "type")]
    pub validator_type: ReviewerCategory,
    pub remaining: usize,
    pub processed: usize,
}

/// GET /api/progress?type=general|lawyers
pub async fn get_progress(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<ProgressResponse>> {
    let category = query.category()?;
    let engine = Arc::clone(&state.engine);

    let (remaining, processed) = tokio::task::spawn_blocking(move || {
        let remaining = engine.selector().remaining_count(category)?;
        Ok::<_, hhv_common::Error>((remaining, engine.ledger().len(category)))
    })
    .await??;

    Ok(Json(ProgressResponse {
        validator_type: category,
        remaining,
        processed,
    }))
}

/// Build progress routes
pub fn progress_routes() -> Router<AppState> {
    Router::new().route("/api/progress", get(get_progress))
}
