use api::routes::routes;
use api::state::AppState;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use common::{Clock, FixedClock};
use db::test_utils::setup_test_db;
use db::Store;
use services::embedding_provider::{EmbeddingProvider, StubEmbeddingProvider};
use services::SettingsCache;
use std::convert::Infallible;
use std::sync::Arc;
use tower::util::BoxCloneService;
use tower::ServiceExt;

pub async fn make_test_app() -> (BoxCloneService<Request<Body>, Response, Infallible>, AppState) {
    make_test_app_with_provider(StubEmbeddingProvider::no_face()).await
}

pub async fn make_test_app_with_provider(
    provider: impl EmbeddingProvider + 'static,
) -> (BoxCloneService<Request<Body>, Response, Infallible>, AppState) {
    let db_conn = setup_test_db().await;
    let store = Arc::new(Store::new(db_conn));

    let now = chrono::NaiveDate::from_ymd_opt(2026, 2, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now));
    let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(provider);
    let settings = Arc::new(SettingsCache::load(store.clone()).await.unwrap());

    let state = AppState::new(store, clock, embedding_provider, settings);
    let router = routes(state.clone());

    (router.into_service().boxed_clone(), state)
}
