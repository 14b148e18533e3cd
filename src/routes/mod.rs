pub mod bookings;
pub mod classes;
pub mod health;
pub mod session;
pub mod students;
pub mod sync;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// All HTTP routes, with state applied. Middleware is added by the caller.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // State snapshot and manual sync
        .route("/api/state", get(sync::get_state))
        .route("/api/sync", post(sync::sync_now))
        // Sign-in, spreadsheet selection, auto-sync toggle
        .nest("/api/session", session::router())
        .nest("/api/students", students::router())
        .nest("/api/classes", classes::router())
        .nest("/api/bookings", bookings::router())
        .with_state(state)
}
