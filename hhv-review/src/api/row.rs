//! Row fetch and submit endpoints
//!
//! GET  /api/row?type=general|lawyers  → next row to review
//! POST /api/row {result, folder}       → persist a validated result

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use hhv_common::{Error, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use super::CategoryQuery;
use crate::review::validate_submission;
use crate::{ApiError, ApiResult, AppState, RowFetch};

/// Submit request body; both fields are required
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
}

/// GET /api/row
///
/// Returns `{row, folder, remaining}`; `row` and `folder` are null once the
/// category is exhausted.
pub async fn get_next_row(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Json<RowFetch>> {
    let category = query.category()?;
    let engine = Arc::clone(&state.engine);

    match tokio::task::spawn_blocking(move || engine.fetch_next(category)).await {
        Ok(Ok(fetch)) => Ok(Json(fetch)),
        Ok(Err(e)) => {
            error!(category = %category, error = %e, "Error fetching row");
            Err(ApiError::FetchFailed(e.to_string()))
        }
        Err(e) => {
            error!(category = %category, error = %e, "Fetch task failed");
            Err(ApiError::FetchFailed(e.to_string()))
        }
    }
}

/// POST /api/row
///
/// The result is only acknowledged once it is saved and its id is marked
/// processed. Any failure response means the submission is not durable and
/// the whole submit should be retried.
pub async fn submit_row(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (result, folder) = match (request.result, request.folder) {
        (Some(result), Some(folder)) if !result.is_null() && !folder.is_empty() => {
            (result, folder)
        }
        _ => return Err(ApiError::BadRequest("Missing result or folder".to_string())),
    };

    let result: ValidationResult = serde_json::from_value(result)
        .map_err(|e| ApiError::BadRequest(format!("Invalid result: {}", e)))?;

    // Unknown folders never reach the filesystem
    if !state.engine.folders().contains(result.validator_type, &folder) {
        warn!(folder = %folder, category = %result.validator_type, "Rejected submit for unknown folder");
        return Err(ApiError::BadRequest(format!(
            "Folder '{}' is not configured for {} reviewers",
            folder, result.validator_type
        )));
    }

    let engine = Arc::clone(&state.engine);
    let outcome = tokio::task::spawn_blocking(move || {
        let source = engine.source_row(&folder, &result.id)?;
        validate_submission(&result, &folder, engine.folders(), source.as_ref())?;
        engine.submit(&result, &folder)
    })
    .await?;

    match outcome {
        Ok(()) => Ok(Json(SubmitResponse { success: true })),
        Err(Error::InvalidInput(msg)) => {
            warn!(reason = %msg, "Rejected submit");
            Err(ApiError::BadRequest(msg))
        }
        Err(e) => {
            error!(error = %e, "Error saving validation");
            Err(ApiError::Internal(format!("Failed to save validation: {}", e)))
        }
    }
}

/// Build row routes
pub fn row_routes() -> Router<AppState> {
    Router::new().route("/api/row", get(get_next_row).post(submit_row))
}
