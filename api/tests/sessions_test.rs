mod helpers;

use axum::body::{to_bytes, Body as AxumBody};
use axum::http::{Request, StatusCode};
use helpers::make_test_app;
use serde_json::{json, Value};
use tower::ServiceExt;

#[tokio::test]
async fn create_and_list_sessions_by_date() {
    let (app, state) = make_test_app().await;
    let now = state.clock.now();
    let course = state.store.create_course("COS301", "SE", None, now).await.unwrap();

    let starts_at = now;
    let ends_at = now + chrono::Duration::hours(1);
    let body = json!({
        "courseId": course.id,
        "startsAt": starts_at,
        "endsAt": ends_at,
    });
    let req = Request::builder()
        .method("POST")
        .uri("/sessions/")
        .header("content-type", "application/json")
        .body(AxumBody::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let date = starts_at.date().format("%Y-%m-%d").to_string();
    let req = Request::builder()
        .method("GET")
        .uri(format!("/sessions/?date={date}"))
        .body(AxumBody::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
