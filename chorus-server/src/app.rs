use crate::config::ServerConfig;
use crate::hub::{Hub, HubHandle};
use crate::sfu::{MediaManager, event_bus};
use crate::signaling::ws_handler;
use crate::storage::Storage;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Everything a connection needs: the hub, the call, storage and settings.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub media: MediaManager,
    pub storage: Arc<dyn Storage>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Builds the media manager and spawns the hub task. Needs a running
    /// tokio runtime.
    pub fn new(config: ServerConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let (events, event_rx) = event_bus();
        let media = MediaManager::new(
            config.transport.clone(),
            events,
            config.negotiation_timeout,
        )?;
        let hub = Hub::spawn(media.clone(), event_rx);

        Ok(Self {
            hub,
            media,
            storage,
            config: Arc::new(config),
        })
    }
}

pub fn router(state: AppState) -> Router {
    // Браузерный клиент обычно живёт на другом origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Chat server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    info!("Chat server stopped");
    Ok(())
}

pub async fn serve(config: ServerConfig, storage: Arc<dyn Storage>) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    let state = AppState::new(config, storage)?;

    serve_on(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
