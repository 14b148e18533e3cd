use std::sync::Arc;

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::services::data::DataState;
use crate::AppState;

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<DataState> {
    Json(state.service.state())
}

/// Re-read every table from the spreadsheet.
pub async fn sync_now(State(state): State<Arc<AppState>>) -> AppResult<Json<DataState>> {
    state.service.sync_all().await?;
    Ok(Json(state.service.state()))
}
