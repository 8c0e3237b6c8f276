use crate::response::ApiResponse;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

/// Builds the `/healthz` route group — a single liveness/readiness probe,
/// in the teacher's convention of a dedicated health route module.
pub fn health_routes() -> Router<crate::state::AppState> {
    Router::new().route("/", get(health_check))
}

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success("OK", "Health check passed"))
}

#[cfg(test)]
mod tests {
    use super::health_check;
    use axum::body::to_bytes;
    use axum::response::IntoResponse;
    use serde_json::Value;

    #[tokio::test]
    async fn health_check_returns_ok_json() {
        let response = health_check().await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "OK");
    }
}
