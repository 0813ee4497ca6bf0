//! HTTP server command.

use std::net::{IpAddr, SocketAddr};
use tokio::sync::broadcast;
use tracing::{info, warn};
use yathra_config::Config;
use yathra_server::{AppState, run_server, spawn_session_sweeper};

use super::build_manager;

/// Input parameters for the Serve command strategy.
#[derive(Debug, Clone)]
pub struct ServeInput {
    /// Bind address override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
}

/// Strategy for running the chat API.
///
/// Serves `POST /chat` and the landing page until Ctrl+C, sweeping idle
/// sessions in the background.
#[derive(Debug, Clone, Copy)]
pub struct ServeStrategy;

impl super::CommandStrategy for ServeStrategy {
    type Input = ServeInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let manager = build_manager(&config)?;
        let state = AppState::new(manager);

        let host = input.host.unwrap_or_else(|| config.server.host.clone());
        let port = input.port.unwrap_or(config.server.port);
        let ip: IpAddr = host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid host '{host}': {e}"))?;
        let addr = SocketAddr::new(ip, port);

        if !config.server.static_dir.is_dir() {
            warn!(
                "Static directory {} not found, GET / will return 404",
                config.server.static_dir.display()
            );
        }

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let sweeper = spawn_session_sweeper(
            state.store().clone(),
            config.sessions.sweep_interval(),
            shutdown_tx.subscribe(),
        );

        let signal_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down");
                let _ = signal_tx.send(());
            }
        });

        let served = run_server(
            state.clone(),
            addr,
            &config.server.static_dir,
            shutdown_tx.subscribe(),
        )
        .await;

        let _ = shutdown_tx.send(());
        let _ = sweeper.await;

        let store = state.store();
        info!("Dropping {} sessions", store.len().await);
        store.clear().await;

        served?;
        Ok(())
    }
}
