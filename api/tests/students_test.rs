mod helpers;

use axum::body::{to_bytes, Body as AxumBody};
use axum::http::{Request, StatusCode};
use helpers::make_test_app;
use serde_json::{json, Value};
use tower::ServiceExt;

#[tokio::test]
async fn create_student_rejects_malformed_external_id() {
    let (app, _state) = make_test_app().await;

    let body = json!({ "externalId": "not-an-id", "name": "Jane" });
    let req = Request::builder()
        .method("POST")
        .uri("/students/")
        .header("content-type", "application/json")
        .body(AxumBody::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn duplicate_external_id_is_a_conflict() {
    let (app, state) = make_test_app().await;
    let now = state.clock.now();
    state.store.create_student("ST11111111", "First", None, now).await.unwrap();

    let body = json!({ "externalId": "ST11111111", "name": "Second" });
    let req = Request::builder()
        .method("POST")
        .uri("/students/")
        .header("content-type", "application/json")
        .body(AxumBody::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
