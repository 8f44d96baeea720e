// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upgrade handler for the live connection endpoint.
//!
//! The upgrade is authenticated with the same session cookie as the REST
//! endpoints. A request without a valid session is answered with 401 and
//! never upgraded.

use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tracing::debug;

use crate::error::ApiError;
use crate::live::session;
use crate::transport::auth::{self, Viewer};
use crate::transport::state::AppState;

pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let viewer = match auth::resolve_viewer(&state, &headers).await {
        Ok(viewer) => viewer,
        Err(e) => {
            debug!(err = %e, "refusing upgrade");
            return ApiError::from(e).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_connection(state, viewer, socket)).into_response()
}

async fn handle_connection(state: Arc<AppState>, viewer: Viewer, socket: WebSocket) {
    let hub = Arc::clone(&state.hub);
    let conn = hub.open(viewer.user_id, viewer.session_id.clone());

    // The session may have ended since the upgrade was authorized. Once the
    // connection is tracked, a later logout closes it; an earlier one shows
    // up here.
    let still_valid = matches!(
        state.stores.sessions.resolve(&viewer.token).await,
        Ok((user_id, ref session_id)) if user_id == viewer.user_id && *session_id == viewer.session_id
    );
    if !still_valid {
        debug!(user_id = %viewer.user_id, "session ended during upgrade");
        conn.request_close();
    }

    let (sink, stream) = socket.split();
    session::run(hub, conn, sink, stream).await;
}
