// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity types and the records carried by live events.
//!
//! Users, chats and notifications are owned by the relational store; the
//! live layer only ever holds copies of them for the span of one dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Conversation identifier as assigned by the store.
pub type ChatId = i64;

/// Notification row identifier.
pub type NotificationId = i64;

/// Opaque user identity, foreign to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login session identifier (the value behind the session cookie).
///
/// Several live connections share one `SessionId` when a browser opens
/// multiple tabs; it is the key used for self-echo suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one accepted live connection. Generated at accept time and
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(format!("conn-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type", default = "default_message_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    /// Whether the receiving session belongs to the sender (multi-tab echo).
    #[serde(default)]
    pub is_own: bool,
    #[serde(default)]
    pub created_at: u64,
}

fn default_message_kind() -> String {
    "text".to_owned()
}

/// Client-supplied body of a new chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDraft {
    pub content: String,
    #[serde(rename = "type", default = "default_message_kind")]
    pub kind: String,
    #[serde(default)]
    pub reply_to: Option<String>,
}

/// A persisted notification addressed to `user_id`, caused by `actor_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub actor_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: u64,
}

/// Input for creating a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub target: UserId,
    pub actor: UserId,
    pub kind: String,
    pub content: String,
}

/// A mutual contact of some user, with the conversation the client keys
/// presence updates by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub user_id: UserId,
    pub chat_id: Option<ChatId>,
}

/// One row of a user's conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: ChatId,
    pub peer_id: UserId,
    pub name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

/// Result of unsending a message: the conversation it belonged to and the
/// message that is now the latest, if any remain.
#[derive(Debug, Clone, PartialEq)]
pub struct Unsent {
    pub chat_id: ChatId,
    pub new_last: Option<ChatMessage>,
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
