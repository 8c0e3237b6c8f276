mod helpers;

use axum::body::{to_bytes, Body as AxumBody};
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use helpers::app::make_test_app_with_provider;
use serde_json::{json, Value};
use services::embedding_provider::StubEmbeddingProvider;
use tower::ServiceExt;

#[tokio::test]
async fn recognize_marks_an_enrolled_student_present() {
    let (app, state) = make_test_app_with_provider(StubEmbeddingProvider::one_face(vec![1.0, 0.0])).await;

    let now = state.clock.now();
    let course = state.store.create_course("COS301", "SE", None, now).await.unwrap();
    let student = state.store.create_student("ST11111111", "A", None, now).await.unwrap();
    state.store.create_enrollment(student.id, course.id, now).await.unwrap();
    state
        .store
        .attach_embeddings(student.id, vec![(vec![1.0, 0.0], 0.9)], db::EnrollmentMode::Append, now)
        .await
        .unwrap();
    let session = state
        .store
        .create_manual_session(course.id, None, now, now + chrono::Duration::hours(1), 5, 5, now)
        .await
        .unwrap();
    state.store.activate_session(session.id).await.unwrap();

    let body = json!({ "image": STANDARD.encode("fake-jpeg-bytes"), "scope": course.id });
    let req = Request::builder()
        .method("POST")
        .uri("/recognize/")
        .header("content-type", "application/json")
        .body(AxumBody::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["result"], "MARKED");
    assert_eq!(json["data"]["status"], "PRESENT");
    assert_eq!(json["data"]["student"], student.id);
}

#[tokio::test]
async fn recognize_with_no_active_session_returns_404() {
    let (app, _state) = make_test_app_with_provider(StubEmbeddingProvider::one_face(vec![1.0, 0.0])).await;

    let body = json!({ "image": STANDARD.encode("fake-jpeg-bytes") });
    let req = Request::builder()
        .method("POST")
        .uri("/recognize/")
        .header("content-type", "application/json")
        .body(AxumBody::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
