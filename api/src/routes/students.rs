use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::AppError;
use serde::Deserialize;
use services::enrollment::{enroll, EnrollmentOutcome, EnrollmentWeights, Frame, QualityGates};

pub fn students_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student))
        .route("/{id}/enroll-frames", post(enroll_frames))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub external_id: String,
    pub name: String,
    pub department: Option<String>,
}

/// POST /students — minimal admin surface (§6): create/list only, no
/// update/delete endpoints; a fuller deployment's seeder is out of scope.
async fn create_student(
    State(state): State<AppState>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = state.clock.now();
    let student = state
        .store
        .create_student(&req.external_id, &req.name, req.department.as_deref(), now)
        .await?;
    Ok(Json(ApiResponse::success(student, "student created")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollFramesRequest {
    pub frames: Vec<String>,
    pub max_embeddings: Option<usize>,
}

/// POST /students/{id}/enroll-frames — runs the full detect/quality-gate/top-K
/// pipeline (§4.4) over the submitted frames and attaches the survivors.
async fn enroll_frames(
    State(state): State<AppState>,
    Path(student_id): Path<i64>,
    Json(req): Json<EnrollFramesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let frames: Vec<Frame> = req
        .frames
        .into_iter()
        .map(|b64| STANDARD.decode(b64).map(|bytes| Frame { bytes }))
        .collect::<Result<_, _>>()
        .map_err(|e| ApiError(AppError::InvalidImage(e.to_string())))?;

    let now = state.clock.now();
    let settings = state.settings.current().await;
    let k_max = req.max_embeddings.unwrap_or(settings.enrollment_k_max);

    let outcome = enroll(
        &state.store,
        state.embedding_provider.as_ref(),
        student_id,
        &frames,
        db::EnrollmentMode::Append,
        settings.enrollment_k_min,
        k_max,
        &EnrollmentWeights::default(),
        &QualityGates::default(),
        now,
    )
    .await?;

    let (status, message) = match &outcome {
        EnrollmentOutcome::Enrolled { embedding_count } => {
            (axum::http::StatusCode::OK, format!("enrolled with {embedding_count} embeddings"))
        }
        EnrollmentOutcome::InsufficientQuality { survivors, required } => (
            axum::http::StatusCode::UNPROCESSABLE_ENTITY,
            format!("only {survivors} of {required} required frames passed quality gates"),
        ),
    };

    Ok((status, Json(ApiResponse::success(format!("{outcome:?}"), message))))
}
