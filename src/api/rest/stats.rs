//! Stats endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use super::store_error_response;
use crate::api::state::AppState;
use crate::stats::{PageRequest, StatsAggregator};

/// Query parameters for stats
///
/// Kept as raw strings so a non-numeric value falls back to the default
/// instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/stats - All-time totals plus one page of recent visits
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> impl IntoResponse {
    let request = PageRequest::from_query(params.page.as_deref(), params.limit.as_deref());

    match StatsAggregator::new(state.store.as_ref()).get_stats(request) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => store_error_response(&e),
    }
}
