use crate::response::ApiResponse;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::AppError;

/// Maps `AppError` onto the status-code table in SPEC §7. Transient
/// infrastructure errors get a `Retry-After` hint; everything else is a
/// plain JSON `ApiResponse::error`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, retry_after) = match &self.0 {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            AppError::InvalidIdFormat(_) | AppError::InvalidImage(_) | AppError::Validation(_) => {
                (StatusCode::BAD_REQUEST, None)
            }
            AppError::DuplicateStudentId(_) | AppError::EnrollmentConflict | AppError::SessionClosed => {
                (StatusCode::CONFLICT, None)
            }
            AppError::StoreUnavailable(_) | AppError::EmbeddingUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, Some(1))
            }
            AppError::Timeout => (StatusCode::SERVICE_UNAVAILABLE, Some(1)),
        };

        let body = Json(ApiResponse::<()>::error(self.0.to_string()));
        let mut response = (status, body).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from_str(&seconds.to_string()).unwrap());
        }
        response
    }
}
