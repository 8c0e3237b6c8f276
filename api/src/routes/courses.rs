use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

pub fn courses_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course))
        .route("/{id}/enroll", post(enroll_student))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    pub code: String,
    pub name: String,
    pub instructor: Option<String>,
}

/// POST /courses — minimal admin surface (§6), same rationale as `/students`.
async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let course = state.store.create_course(&req.code, &req.name, req.instructor.as_deref(), now).await?;
    Ok(Json(ApiResponse::success(course, "course created")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudentRequest {
    pub student_id: i64,
}

/// POST /courses/{id}/enroll
async fn enroll_student(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    Json(req): Json<EnrollStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let enrollment = state.store.create_enrollment(req.student_id, course_id, now).await?;
    Ok(Json(ApiResponse::success(enrollment, "student enrolled")))
}
