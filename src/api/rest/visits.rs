//! Visit ingestion endpoint

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::store_error_response;
use crate::api::client_addr::resolve_client_addr;
use crate::api::state::AppState;
use crate::types::{VisitInput, VisitRecord};
use crate::utils::now_seconds;

/// Body of `POST /api/visit`
///
/// Fields are loosely typed; a field of the wrong type is treated as absent
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitPayload {
    #[serde(default)]
    pub referrer: Value,
    #[serde(default)]
    pub screen_width: Value,
    #[serde(default)]
    pub screen_height: Value,
    #[serde(default)]
    pub language: Value,
}

fn as_dimension(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

impl VisitPayload {
    /// Parse a request body; a missing or malformed body counts as `{}`
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::default(),
        }
    }

    /// Combine the body with request-derived values
    ///
    /// The body's referrer wins over the `Referer` header when it is a
    /// non-empty string.
    pub fn into_input(
        self,
        source_address: String,
        user_agent: String,
        referer_header: Option<String>,
    ) -> VisitInput {
        let referrer = as_text(&self.referrer)
            .filter(|r| !r.is_empty())
            .or(referer_header)
            .unwrap_or_default();

        VisitInput {
            source_address,
            user_agent,
            referrer,
            screen_width: as_dimension(&self.screen_width),
            screen_height: as_dimension(&self.screen_height),
            language: as_text(&self.language),
        }
    }
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// POST /api/visit - Record a page view
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let source_address = resolve_client_addr(&headers, peer);
    let user_agent = header_string(&headers, header::USER_AGENT).unwrap_or_default();
    let referer = header_string(&headers, header::REFERER);

    let input = VisitPayload::from_body(&body).into_input(source_address, user_agent, referer);
    let record = VisitRecord::ingest(input, state.classifier.as_ref(), now_seconds());
    debug!(ip = %record.source_address, device = %record.device_class, "Recording visit");

    match state.store.append(record) {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => store_error_response(&e),
    }
}
