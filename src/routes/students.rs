use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::db::models::{NewStudent, Student, StudentUpdate};
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_students).post(add_student))
        .route("/:id", put(edit_student))
}

/// Students as of the last sync, deactivated ones included.
async fn list_students(State(state): State<Arc<AppState>>) -> Json<Vec<Student>> {
    Json(state.service.state().students)
}

async fn add_student(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewStudent>,
) -> AppResult<(StatusCode, Json<Student>)> {
    let student = state.service.add_student(body).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Partial update. Sending `{"active": false}` deactivates the student.
async fn edit_student(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StudentUpdate>,
) -> AppResult<Json<Student>> {
    let student = state.service.edit_student(&id, body).await?;
    Ok(Json(student))
}
