use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::resume_service::ResumeServiceClient;
use crate::selection::capture::SelectionCreated;
use crate::selection::menu::ActionHandler;
use crate::selection::store::CaptureStore;

/// Buffered selection notifications per subscriber before it starts lagging.
pub const SELECTION_EVENT_CAPACITY: usize = 64;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub service: ResumeServiceClient,
    /// Per-owner capture lists. Redis-backed in production.
    pub selections: Arc<dyn CaptureStore>,
    pub events: broadcast::Sender<SelectionCreated>,
    /// Handler for action-menu choices. Default: LoggingActionHandler.
    pub actions: Arc<dyn ActionHandler>,
}

/// State for router tests: a pool that never connects unless a query runs, an unreachable
/// resume service and an in-memory capture store.
#[cfg(test)]
pub fn test_state() -> AppState {
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;

    use crate::selection::menu::LoggingActionHandler;
    use crate::selection::store::InMemoryCaptureStore;

    let config = Config {
        database_url: "postgres://localhost/resume_test".to_string(),
        redis_url: "redis://127.0.0.1/".to_string(),
        jwt_secret: "test-secret".to_string(),
        resume_service_url: "http://127.0.0.1:9".to_string(),
        service_timeout_secs: 1,
        session_ttl_secs: 3600,
        cookie_secure: false,
        static_dir: None,
        port: 0,
        rust_log: "debug".to_string(),
    };
    let db = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let service = ResumeServiceClient::new(config.resume_service_url.clone(), Duration::from_secs(1))
        .expect("http client");
    let (events, _) = broadcast::channel(SELECTION_EVENT_CAPACITY);

    AppState {
        db,
        config,
        service,
        selections: Arc::new(InMemoryCaptureStore::new()),
        events,
        actions: Arc::new(LoggingActionHandler),
    }
}
