use common::Clock;
use services::SettingsCache;
use services::embedding_provider::EmbeddingProvider;
use std::sync::Arc;

/// A central place to hold the handles every route needs, loaded once at
/// startup rather than reached through global state (§9 Design Notes).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<db::Store>,
    pub clock: Arc<dyn Clock>,
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub settings: Arc<SettingsCache>,
}

impl AppState {
    pub fn new(
        store: Arc<db::Store>,
        clock: Arc<dyn Clock>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        settings: Arc<SettingsCache>,
    ) -> Self {
        Self { store, clock, embedding_provider, settings }
    }
}
