use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use yathra_session::SessionStore;

use crate::handlers::{chat_handler, health_handler, reset_handler};
use crate::state::AppState;

/// `/chat` API plus the static landing page as the fallback.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/chat", post(chat_handler).delete(reset_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    static_dir: &Path,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let app = build_router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("AI chatbot API running on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        tracing::info!("Server shutting down signal received");
    })
    .await?;

    Ok(())
}

/// Periodically drop idle sessions until shutdown is signalled.
pub fn spawn_session_sweeper(
    store: Arc<SessionStore>,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.evict_expired().await;
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("Session sweeper stopped");
                    break;
                }
            }
        }
    })
}
