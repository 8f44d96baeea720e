// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process wiring: build the store and live hub, serve until a signal.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::live::LiveHub;
use crate::store::{MemoryStore, Stores};
use crate::transport::{build_router, AppState};

/// Build application state from configuration.
pub fn prepare(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let store = match config.fixtures {
        Some(ref path) => {
            info!("loading fixtures from {}", path.display());
            MemoryStore::load(path)?
        }
        None => MemoryStore::new(),
    };
    let stores = Stores::memory(Arc::new(store));
    let hub = Arc::new(LiveHub::new(&stores, config.live_settings()));
    Ok(Arc::new(AppState::new(hub, stores).with_cors_origin(config.cors_origin.clone())))
}

/// Run the server until SIGTERM or SIGINT.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = prepare(&config)?;
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP listening on {}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());
    serve(listener, state, shutdown).await
}

/// Serve on `listener` until `shutdown` fires, then ask every live
/// connection to close.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let hub = Arc::clone(&state.hub);
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            let closing = hub.close_all();
            info!(connections = closing, "shutting down");
        })
        .await?;
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGTERM"),
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGINT"),
        }
        shutdown.cancel();
    });
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
