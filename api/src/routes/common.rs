use crate::response::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use services::RecognizeResult;

/// Renders a `RecognizeResult` into the JSON shapes described in §6, with the
/// status codes from the §6/§7 table. Shared by `/recognize` and
/// `/attendance/mark` since both funnel through the same outcome family.
pub fn recognize_result_response(result: RecognizeResult) -> Response {
    let (status, body): (StatusCode, Value) = match result {
        RecognizeResult::Marked { student_id, status, confidence, session_id } => (
            StatusCode::OK,
            json!({
                "result": "MARKED",
                "student": student_id,
                "status": status.to_string().to_uppercase(),
                "confidence": confidence,
                "sessionId": session_id,
            }),
        ),
        RecognizeResult::ReEntry { student_id, session_id } => (
            StatusCode::CONFLICT,
            json!({ "result": "RE_ENTRY", "student": student_id, "sessionId": session_id }),
        ),
        RecognizeResult::Intruder { student_id, session_id } => (
            StatusCode::OK,
            json!({ "result": "INTRUDER", "student": student_id, "sessionId": session_id }),
        ),
        RecognizeResult::UnknownFace => (StatusCode::OK, json!({ "result": "UNKNOWN_FACE" })),
        RecognizeResult::NoActiveSession => (StatusCode::NOT_FOUND, json!({ "result": "NO_ACTIVE_SESSION" })),
        RecognizeResult::NoFace => (StatusCode::BAD_REQUEST, json!({ "result": "NO_FACE" })),
        RecognizeResult::MultipleFaces => (StatusCode::OK, json!({ "result": "MULTIPLE_FACES" })),
        RecognizeResult::Timeout => (StatusCode::SERVICE_UNAVAILABLE, json!({ "result": "TIMEOUT" })),
        RecognizeResult::AmbiguousSession => (StatusCode::CONFLICT, json!({ "result": "AMBIGUOUS_SESSION" })),
        RecognizeResult::NoEnrolled => (StatusCode::OK, json!({ "result": "NO_ENROLLED" })),
        RecognizeResult::SessionClosed => (StatusCode::CONFLICT, json!({ "result": "SESSION_CLOSED" })),
    };

    (status, Json(ApiResponse::success(body, "recognition processed"))).into_response()
}
