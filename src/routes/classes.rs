use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::ClassDay;
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(start_class))
        .route("/:date", delete(close_class))
}

#[derive(Debug, Deserialize)]
pub struct StartClassRequest {
    pub date: String,
}

async fn start_class(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartClassRequest>,
) -> AppResult<(StatusCode, Json<ClassDay>)> {
    let day = state.service.start_class(&body.date).await?;
    Ok((StatusCode::CREATED, Json(day)))
}

async fn close_class(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> AppResult<StatusCode> {
    state.service.close_class(&date).await?;
    Ok(StatusCode::NO_CONTENT)
}
