//! HTTP API gateway for Waypost.
//!
//! Exposes the chat engine over REST: chat turns, summaries, action
//! suggestions, knowledge ingestion, and store statistics.
//!
//! Built on Axum. The gateway also owns the background expiration
//! sweep: the session store itself only expires lazily.

pub mod api;

use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use waypost_config::AppConfig;
use waypost_engine::ChatEngine;
use waypost_retrieval::{InMemoryIndex, KnowledgeIngestor};
use waypost_session::SessionStore;

pub use api::{GatewayState, SharedState, v1_router};

use axum::Router;
use axum::routing::get;

/// Build the full router: health at the root, the v1 API nested.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(api::health_handler))
        .nest("/v1", v1_router(state))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, index, store, and engine once, spawns the
/// expiration sweep, and serves until the process exits.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr = format!("{host}:{port}");

    let router = waypost_providers::router::build_from_config(&config);
    let provider = router
        .default()
        .expect("No default provider configured — set an API key");

    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(SessionStore::new(config.session.ttl_hours));

    let engine = ChatEngine::new(provider.clone(), index.clone(), store.clone(), &config);
    let ingestor = KnowledgeIngestor::new(provider, index.clone());

    // Background expiration sweep. The store behaves correctly without
    // it (lazy expiry); the sweep reclaims memory.
    let sweep_store = store.clone();
    let sweep_interval = std::time::Duration::from_secs(config.session.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = sweep_store.expire_sweep(chrono::Utc::now()).await;
            debug!(removed, "Expiration sweep completed");
        }
    });

    let state = Arc::new(GatewayState {
        engine,
        ingestor,
        index,
        store,
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
