use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub authenticated: bool,
    pub spreadsheet_selected: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub timestamp: String,
}

/// Liveness plus a summary of the session. Never touches the spreadsheet.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let data = state.service.state();
    let response = HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        authenticated: data.is_authenticated,
        spreadsheet_selected: data.spreadsheet_id.is_some(),
        last_synced_at: data.last_synced_at,
        timestamp: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(response))
}
