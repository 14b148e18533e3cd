use std::sync::Arc;

use axum::{
    extract::State,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::i18n;
use crate::services::data::DataState;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/spreadsheet", put(set_spreadsheet))
        .route("/auto-sync", put(set_auto_sync))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SpreadsheetRequest {
    pub spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AutoSyncRequest {
    pub enabled: bool,
}

/// Accept an OAuth access token obtained by the client.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<DataState>> {
    state.service.login(&body.access_token).await?;
    Ok(Json(state.service.state()))
}

async fn logout(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    state.service.logout().await;
    Ok(Json(json!({ "message": i18n::t("auth.logged_out") })))
}

/// Select the spreadsheet. Loading it is a separate `POST /api/sync`.
async fn set_spreadsheet(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SpreadsheetRequest>,
) -> AppResult<Json<DataState>> {
    state.service.set_spreadsheet_id(&body.spreadsheet_id).await?;
    Ok(Json(state.service.state()))
}

async fn set_auto_sync(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AutoSyncRequest>,
) -> AppResult<Json<DataState>> {
    state.service.set_auto_sync(body.enabled).await;
    Ok(Json(state.service.state()))
}
