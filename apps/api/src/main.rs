mod auth;
mod chat;
mod config;
mod dashboard;
mod db;
mod errors;
mod models;
mod profile;
mod resume;
mod resume_service;
mod routes;
mod selection;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::resume_service::ResumeServiceClient;
use crate::routes::build_router;
use crate::selection::menu::LoggingActionHandler;
use crate::selection::store::RedisCaptureStore;
use crate::state::{AppState, SELECTION_EVENT_CAPACITY};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis-backed selection store
    let redis = redis::Client::open(config.redis_url.clone())?;
    let selections = Arc::new(RedisCaptureStore::new(redis));
    info!("Redis client initialized");

    // Initialize resume service client
    let service = ResumeServiceClient::new(
        config.resume_service_url.clone(),
        Duration::from_secs(config.service_timeout_secs),
    )?;
    info!("Resume service client initialized ({})", config.resume_service_url);

    let (events, _) = broadcast::channel(SELECTION_EVENT_CAPACITY);

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        service,
        selections,
        events,
        actions: Arc::new(LoggingActionHandler),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
