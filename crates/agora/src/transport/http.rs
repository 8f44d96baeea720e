// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST endpoints that write to the store and push the result live.
//!
//! Each mutating handler persists first and dispatches afterwards. The
//! response reflects only the store outcome; a push that reaches nobody is
//! not an error.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::event::{Event, MessageDeleted, NotificationDeleted, NotificationMarkedRead, ReadReceipt};
use crate::model::{
    epoch_ms, ChatId, ChatMessage, ChatSummary, MessageDraft, NewNotification, Notification,
    NotificationId, UserId,
};
use crate::transport::auth::{Viewer, SESSION_COOKIE};
use crate::transport::state::AppState;

// -- Response / request types -------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub online_users: usize,
    pub connections: usize,
    pub dropped_events: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeenResponse {
    pub chat_id: ChatId,
    pub last_message: Option<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub user_id: UserId,
    pub online: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub target: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNotificationRequest {
    pub target: UserId,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub updated: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub closed: usize,
}

// -- Handlers -----------------------------------------------------------------

pub async fn health(State(s): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        online_users: s.hub.registry.online_count(),
        connections: s.hub.registry.connection_count(),
        dropped_events: s.hub.router.dropped(),
    })
}

/// `POST /api/send-message/{chat_id}`
///
/// The peer receives the message; the sender's other login sessions receive
/// it flagged `is_own` so every open tab shows the same conversation.
pub async fn send_message(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Path(chat_id): Path<ChatId>,
    Json(draft): Json<MessageDraft>,
) -> Result<impl IntoResponse, ApiError> {
    if draft.content.trim().is_empty() {
        return Err(ApiError::bad_request("message content is empty"));
    }
    let peer = s
        .stores
        .chats
        .other_party(viewer.user_id, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no chat {chat_id}")))?;

    let message = s.stores.chats.persist_message(viewer.user_id, chat_id, draft).await?;

    let own = ChatMessage { is_own: true, ..message.clone() };
    s.hub.dispatch(viewer.user_id, Event::ChatMessage(own.clone()), Some(&viewer.session_id));
    let reached = s.hub.dispatch(peer, Event::ChatMessage(message), None);
    debug!(chat_id, user_id = %viewer.user_id, peer = %peer, reached, "message sent");

    Ok((StatusCode::CREATED, Json(own)))
}

/// `POST /api/set-seen-chat/{chat_id}`
pub async fn set_seen_chat(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<SeenResponse>, ApiError> {
    let peer = s
        .stores
        .chats
        .other_party(viewer.user_id, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no chat {chat_id}")))?;

    let last = s.stores.chats.mark_seen(chat_id, viewer.user_id).await?;

    s.hub.dispatch(
        peer,
        Event::ReadReceipt(ReadReceipt {
            chat_id,
            reader_id: viewer.user_id,
            message: last.clone(),
            timestamp: epoch_ms(),
        }),
        None,
    );
    Ok(Json(SeenResponse { chat_id, last_message: last }))
}

/// `POST /api/unsend-message/{message_id}`
pub async fn unsend_message(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Path(message_id): Path<String>,
) -> Result<Json<MessageDeleted>, ApiError> {
    let unsent = s
        .stores
        .chats
        .unsend(viewer.user_id, &message_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no message {message_id}")))?;

    let deleted = MessageDeleted {
        chat_id: unsent.chat_id,
        message_id,
        new_message: unsent.new_last,
    };
    if let Some(peer) = s.stores.chats.other_party(viewer.user_id, unsent.chat_id).await? {
        s.hub.dispatch(peer, Event::MessageDeleted(deleted.clone()), None);
    }
    s.hub.dispatch(
        viewer.user_id,
        Event::MessageDeleted(deleted.clone()),
        Some(&viewer.session_id),
    );
    Ok(Json(deleted))
}

/// `GET /api/notifications`
pub async fn list_notifications(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(s.stores.notifications.list(viewer.user_id).await?))
}

/// `POST /api/notifications`
pub async fn create_notification(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Json(req): Json<CreateNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.kind.trim().is_empty() {
        return Err(ApiError::bad_request("notification type is empty"));
    }
    let notification = s
        .stores
        .notifications
        .persist(NewNotification {
            target: req.target,
            actor: viewer.user_id,
            kind: req.kind,
            content: req.content,
        })
        .await?;

    let exclude = (req.target == viewer.user_id).then_some(&viewer.session_id);
    s.hub.dispatch(req.target, Event::NotificationNew(notification.clone()), exclude);
    Ok((StatusCode::CREATED, Json(notification)))
}

/// `DELETE /api/notifications`
pub async fn delete_notification(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Json(req): Json<DeleteNotificationRequest>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted =
        s.stores.notifications.delete(viewer.user_id, req.target, &req.kind).await?;
    if deleted {
        let exclude = (req.target == viewer.user_id).then_some(&viewer.session_id);
        s.hub.dispatch(
            req.target,
            Event::NotificationDeleted(NotificationDeleted {
                actor_id: viewer.user_id,
                kind: req.kind,
            }),
            exclude,
        );
    }
    Ok(Json(DeletedResponse { deleted }))
}

/// `POST /api/notifications/{id}/read`
pub async fn mark_notification_read(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<NotificationId>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    if !s.stores.notifications.mark_read(viewer.user_id, id).await? {
        return Err(ApiError::not_found(format!("no notification {id}")));
    }
    s.hub.dispatch(
        viewer.user_id,
        Event::NotificationMarkedRead(NotificationMarkedRead { id: Some(id) }),
        Some(&viewer.session_id),
    );
    Ok(Json(UpdatedResponse { updated: 1 }))
}

/// `POST /api/notifications/read-all`
pub async fn mark_all_notifications_read(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let updated = s.stores.notifications.mark_all_read(viewer.user_id).await?;
    s.hub.dispatch(
        viewer.user_id,
        Event::NotificationMarkedRead(NotificationMarkedRead { id: None }),
        Some(&viewer.session_id),
    );
    Ok(Json(UpdatedResponse { updated }))
}

/// `GET /api/get-users`: the viewer's conversations with the peer's
/// online state.
pub async fn get_users(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Json<Vec<ChatSummary>>, ApiError> {
    let mut chats = s.stores.chats.chats_for(viewer.user_id).await?;
    for chat in &mut chats {
        chat.is_online = Some(s.hub.is_online(chat.peer_id));
    }
    Ok(Json(chats))
}

/// `GET /api/user-status/{chat_id}`
pub async fn user_status(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<StatusResponse>, ApiError> {
    let peer = s
        .stores
        .chats
        .other_party(viewer.user_id, chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no chat {chat_id}")))?;
    Ok(Json(StatusResponse { user_id: peer, online: s.hub.is_online(peer) }))
}

/// `POST /api/logout`: end the login session and every live connection
/// opened under it.
pub async fn logout(
    State(s): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<impl IntoResponse, ApiError> {
    s.stores.sessions.revoke(&viewer.token).await?;
    let closed = s.hub.close_session(&viewer.session_id);
    let expired = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly");
    Ok((AppendHeaders([(header::SET_COOKIE, expired)]), Json(LogoutResponse { closed })))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
