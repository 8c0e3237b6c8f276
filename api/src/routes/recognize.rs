use crate::error::ApiError;
use crate::routes::common::recognize_result_response;
use crate::state::AppState;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use common::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeRequest {
    pub image: String,
    pub scope: Option<i64>,
}

pub fn recognize_routes() -> Router<AppState> {
    Router::new().route("/", post(recognize))
}

/// POST /recognize — runs the full face-recognition pipeline (§4.7) against
/// whichever active session `scope` (a course id) resolves to.
async fn recognize(
    State(state): State<AppState>,
    Json(req): Json<RecognizeRequest>,
) -> Result<Response, ApiError> {
    let image = STANDARD
        .decode(req.image)
        .map_err(|e| ApiError(AppError::InvalidImage(e.to_string())))?;

    let settings = state.settings.current().await;
    let result = services::attendance_service::recognize(
        &state.store,
        state.clock.as_ref(),
        state.embedding_provider.as_ref(),
        settings.confidence_threshold,
        &image,
        req.scope,
    )
    .await?;

    Ok(recognize_result_response(result))
}
