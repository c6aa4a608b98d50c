//! HTTP API handlers for hhv-review

pub mod health;
pub mod progress;
pub mod row;

pub use health::health_routes;
pub use progress::progress_routes;
pub use row::row_routes;

use hhv_common::ReviewerCategory;
use serde::Deserialize;

use crate::ApiError;

/// `?type=general|lawyers`
#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type")]
    pub validator_type: Option<String>,
}

impl CategoryQuery {
    /// Parse the category, rejecting missing or unknown values
    pub fn category(&self) -> Result<ReviewerCategory, ApiError> {
        self.validator_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "Invalid validator type. Use ?type=general or ?type=lawyers".to_string(),
                )
            })
    }
}
