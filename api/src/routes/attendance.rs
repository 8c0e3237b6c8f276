use crate::error::ApiError;
use crate::routes::common::recognize_result_response;
use crate::state::AppState;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub session_id: i64,
    pub student_id: i64,
}

pub fn attendance_routes() -> Router<AppState> {
    Router::new().route("/mark", post(mark))
}

/// POST /attendance/mark — the manual counterpart to `/recognize`: same
/// result family minus `UNKNOWN_FACE` (§6), since no matching is involved.
async fn mark(State(state): State<AppState>, Json(req): Json<MarkRequest>) -> Result<Response, ApiError> {
    let result =
        services::attendance_service::mark(&state.store, state.clock.as_ref(), req.session_id, req.student_id)
            .await?;
    Ok(recognize_result_response(result))
}
