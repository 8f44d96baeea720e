// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP and WebSocket surface.

pub mod auth;
pub mod http;
pub mod state;
pub mod ws;

pub use state::AppState;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Browser CORS policy. With an explicit origin, cookies are allowed so the
/// session cookie reaches both the REST endpoints and the upgrade.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        None => CorsLayer::permissive(),
    }
}

/// Build the axum `Router` with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.cors_origin.as_deref());
    Router::new()
        .route("/api/health", get(http::health))
        .route("/api/send-message/{chat_id}", post(http::send_message))
        .route("/api/set-seen-chat/{chat_id}", post(http::set_seen_chat))
        .route("/api/unsend-message/{message_id}", post(http::unsend_message))
        .route(
            "/api/notifications",
            get(http::list_notifications)
                .post(http::create_notification)
                .delete(http::delete_notification),
        )
        .route("/api/notifications/read-all", post(http::mark_all_notifications_read))
        .route("/api/notifications/{id}/read", post(http::mark_notification_read))
        .route("/api/get-users", get(http::get_users))
        .route("/api/user-status/{chat_id}", get(http::user_status))
        .route("/api/logout", post(http::logout))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
