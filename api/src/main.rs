use api::config::ApiConfig;
use api::routes::routes;
use api::state::AppState;
use common::{logger, Clock, SystemClock};
use services::embedding_provider::{EmbeddingProvider, StubEmbeddingProvider};
use services::{Scheduler, SettingsCache};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() {
    let config = ApiConfig::init(".env");

    logger::init_logger(&config.log_level, &config.log_file);
    log::info!("starting {} backend...", config.project_name);

    let db = db::connect(&config.database_url).await;
    let store = Arc::new(db::Store::new(db));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // A real deployment swaps this for a provider backed by an actual face
    // detection/embedding model; nothing else in the pipeline depends on
    // which one is wired in here (§4.3).
    let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(StubEmbeddingProvider::no_face());
    let settings = Arc::new(
        SettingsCache::load(store.clone())
            .await
            .expect("failed to load settings at startup"),
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler = Scheduler::new(store.clone(), clock.clone(), settings.clone());
    let scheduler_shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        scheduler.run(scheduler_shutdown_rx).await;
    });

    let state = AppState::new(store, clock, embedding_provider, settings);
    let app = routes(state);

    let addr = SocketAddr::new(config.host.parse().expect("invalid HOST"), config.port);
    let listener = TcpListener::bind(addr).await.expect("failed to bind to address");
    log::info!("{}-api running at http://{addr}", config.project_name);

    axum::serve(listener, app).await.expect("server error");
}
