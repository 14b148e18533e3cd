use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Booking, BookingInfo};
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_bookings).post(add_booking))
        .route("/:date/:student_id", delete(remove_booking))
}

#[derive(Debug, Deserialize)]
pub struct AddBookingRequest {
    pub date: String,
    pub student_ids: Vec<String>,
}

/// Bookings grouped per date, as of the last sync.
async fn list_bookings(State(state): State<Arc<AppState>>) -> Json<Vec<BookingInfo>> {
    Json(state.service.state().bookings)
}

async fn add_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddBookingRequest>,
) -> AppResult<(StatusCode, Json<Vec<Booking>>)> {
    let added = state
        .service
        .add_booking(&body.date, &body.student_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_booking(
    State(state): State<Arc<AppState>>,
    Path((date, student_id)): Path<(String, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state.service.remove_booking(&student_id, &date).await?;
    Ok(Json(json!({ "removed": removed })))
}
