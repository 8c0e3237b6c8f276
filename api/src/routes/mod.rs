//! Top-level routing configuration for the API.
//!
//! Each submodule owns one route group; they are composed together here.
//!
//! ## Structure
//! - `health.rs` — `/healthz` liveness probe.
//! - `recognize.rs` — `/recognize`, the camera-driven pipeline.
//! - `attendance.rs` — `/attendance/mark`, the manual counterpart.
//! - `sessions.rs` — `/sessions` CRUD-lite + lifecycle transitions.
//! - `students.rs` — `/students` creation + frame enrollment.
//! - `courses.rs` — `/courses` creation + enrollment.

pub mod attendance;
pub mod common;
pub mod courses;
pub mod health;
pub mod recognize;
pub mod sessions;
pub mod students;

use crate::state::AppState;
use attendance::attendance_routes;
use axum::Router;
use courses::courses_routes;
use health::health_routes;
use recognize::recognize_routes;
use sessions::sessions_routes;
use students::students_routes;
use tower_http::cors::CorsLayer;

/// Builds the complete application router.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest("/healthz", health_routes())
        .nest("/recognize", recognize_routes())
        .nest("/attendance", attendance_routes())
        .nest("/sessions", sessions_routes())
        .nest("/students", students_routes())
        .nest("/courses", courses_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
