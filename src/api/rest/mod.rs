//! REST API module for HTTP endpoints
//!
//! - `POST /api/visit` - Record a page view
//! - `GET /api/stats` - Totals plus a page of recent visits

pub mod stats;
pub mod visits;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::store::StoreError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn store(err: &StoreError) -> Self {
        Self {
            error: err.to_string(),
            code: "STORE_ERROR".to_string(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: "UNAVAILABLE".to_string(),
        }
    }
}

/// Map a store failure to an HTTP response
pub(crate) fn store_error_response(err: &StoreError) -> axum::response::Response {
    match err {
        StoreError::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::unavailable("visit store is shutting down")),
        )
            .into_response(),
        other => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::store(other))).into_response(),
    }
}
