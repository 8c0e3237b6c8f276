use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use common::AppError;
use db::models::session;
use serde::Deserialize;
use std::str::FromStr;

pub fn sessions_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(create_session))
        .route("/{id}/activate", put(activate_session))
        .route("/{id}/end", put(end_session))
        .route("/{id}/cancel", put(cancel_session))
        .route("/{id}/attendance", get(session_attendance))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub date: Option<String>,
    pub status: Option<String>,
}

/// GET /sessions?date=YYYY-MM-DD&status=...
async fn list_sessions(
    State(state): State<AppState>,
    Query(q): Query<SessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = q
        .date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| ApiError(AppError::Validation(format!("invalid date: {e}"))))?;
    let status = q
        .status
        .as_deref()
        .map(session::Status::from_str)
        .transpose()
        .map_err(|_| ApiError(AppError::Validation("invalid status".into())))?;

    let sessions = state.store.list_sessions(date, status).await?;
    Ok(Json(ApiResponse::success(sessions, "sessions listed")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub course_id: i64,
    pub starts_at: chrono::NaiveDateTime,
    pub ends_at: chrono::NaiveDateTime,
    pub late_threshold_minutes: Option<i32>,
    pub timetable_slot_id: Option<i64>,
}

/// POST /sessions — manual creation; enforces `(slot, date)` uniqueness only
/// if `timetableSlotId` is supplied (that uniqueness lives in the partial
/// unique index, so it is enforced regardless of which path inserts the row).
async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let settings = state.settings.current().await;
    let late_threshold_minutes =
        req.late_threshold_minutes.unwrap_or(settings.late_threshold_default_minutes);

    let session = state
        .store
        .create_manual_session(
            req.course_id,
            req.timetable_slot_id,
            req.starts_at,
            req.ends_at,
            late_threshold_minutes,
            settings.finalizer_buffer_minutes,
            now,
        )
        .await?;
    Ok(Json(ApiResponse::success(session, "session created")))
}

async fn activate_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.activate_session(id).await?;
    Ok(Json(ApiResponse::success(session, "session activated")))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let outcome = services::finalizer::finalize(&state.store, id, now).await?;
    Ok(Json(ApiResponse::success(format!("{outcome:?}"), "session ended")))
}

async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.cancel_session(id).await?;
    Ok(Json(ApiResponse::success(session, "session cancelled")))
}

async fn session_attendance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.store.list_attendance_for_session(id).await?;
    Ok(Json(ApiResponse::success(rows, "attendance listed")))
}
