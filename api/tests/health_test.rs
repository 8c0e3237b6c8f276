mod helpers;

use axum::body::{to_bytes, Body as AxumBody};
use axum::http::{Request, StatusCode};
use helpers::make_test_app;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok_json() {
    let (app, _state) = make_test_app().await;

    let req = Request::builder().method("GET").uri("/healthz/").body(AxumBody::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"], "OK");
}
