// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a seeded app, server spawner and assertion
//! helpers.

use std::sync::Arc;

use axum::Router;

use crate::live::{LiveHub, LiveSettings};
use crate::model::{ChatId, UserId};
use crate::store::{MemoryStore, Stores};
use crate::transport::auth::SESSION_COOKIE;
use crate::transport::{build_router, AppState};

pub const ADA: UserId = UserId(1);
pub const BOB: UserId = UserId(2);
pub const CY: UserId = UserId(3);
/// Conversation between [`ADA`] and [`BOB`].
pub const ADA_BOB_CHAT: ChatId = 10;

/// A seeded in-memory store plus the state built on it.
///
/// Ada and Bob follow each other and share chat 10; Cy follows Ada and has
/// no chat with her.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(LiveSettings { queue_capacity: 64, ping_interval: None, idle_timeout: None })
    }

    pub fn with_settings(settings: LiveSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.add_user(ADA, "ada");
        store.add_user(BOB, "bob");
        store.add_user(CY, "cy");
        store.add_chat(ADA_BOB_CHAT, ADA, BOB);
        store.follow(ADA, BOB);
        store.follow(BOB, ADA);
        store.follow(CY, ADA);

        let stores = Stores::memory(Arc::clone(&store));
        let hub = Arc::new(LiveHub::new(&stores, settings));
        let state = Arc::new(AppState::new(hub, stores));
        Self { store, state }
    }

    pub fn hub(&self) -> &LiveHub {
        &self.state.hub
    }

    /// Log `user` in and return the `Cookie` header value for the session.
    pub fn login(&self, user: UserId) -> String {
        session_cookie(&self.store.login(user))
    }

    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}")
}

/// Extension trait to convert any `Display` error into `anyhow::Error`.
/// Replaces `.map_err(|e| anyhow::anyhow!("{e}"))` with `.anyhow()`.
pub trait AnyhowExt<T> {
    fn anyhow(self) -> anyhow::Result<T>;
}

impl<T, E: std::fmt::Display> AnyhowExt<T> for Result<T, E> {
    fn anyhow(self) -> anyhow::Result<T> {
        self.map_err(|e| anyhow::anyhow!("{e}"))
    }
}

/// Spawn an HTTP server on a random port for integration testing.
///
/// Returns the bound address and a join handle for the server task.
pub async fn spawn_http_server(
    state: Arc<AppState>,
) -> anyhow::Result<(std::net::SocketAddr, tokio::task::JoinHandle<()>)> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
