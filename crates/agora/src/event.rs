// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live events and their server-to-client wire encoding.
//!
//! Every outbound frame is `{"channel": ..., "to": <user>, "payload": ...}`.
//! The channel names are the ones browser clients already switch on, so
//! they are fixed strings rather than a serde tag.

use serde::Serialize;

use crate::model::{ChatId, ChatMessage, Notification, NotificationId, UserId};

/// Outbound channel discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Chat,
    ChatSeen,
    ChatDelete,
    Notifications,
    NotificationsNew,
    NotificationsDelete,
    NotificationsRead,
    Status,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::ChatSeen => "chat-seen",
            Self::ChatDelete => "chat-delete",
            Self::Notifications => "notifications",
            Self::NotificationsNew => "notifications-new",
            Self::NotificationsDelete => "notifications-delete",
            Self::NotificationsRead => "notifications-read",
            Self::Status => "status",
        }
    }
}

/// A conversation was read by `reader_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadReceipt {
    pub chat_id: ChatId,
    pub reader_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    pub timestamp: u64,
}

/// A message was unsent; `new_message` is the conversation's latest message
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDeleted {
    pub chat_id: ChatId,
    pub message_id: String,
    pub new_message: Option<ChatMessage>,
}

/// A client asked a peer to refresh notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPing {
    pub from: UserId,
    pub data: serde_json::Value,
}

/// A notification caused by `actor_id` was withdrawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationDeleted {
    pub actor_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Notifications were marked read. `id: None` means all of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationMarkedRead {
    pub id: Option<NotificationId>,
}

/// A contact came online or went offline.
///
/// `user` is the conversation id shared with the observer, which is what the
/// client keys its chat list by; `peer_id` is the contact's user id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceChange {
    pub user: Option<ChatId>,
    pub peer_id: UserId,
    pub status: bool,
}

/// An immutable live event. Constructed by a REST handler, a read loop or
/// the presence tracker, shared across every target connection, and
/// dropped once the last write loop has written it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    ChatMessage(ChatMessage),
    MessageDeleted(MessageDeleted),
    ReadReceipt(ReadReceipt),
    NotificationPing(NotificationPing),
    NotificationNew(Notification),
    NotificationDeleted(NotificationDeleted),
    NotificationMarkedRead(NotificationMarkedRead),
    PresenceChange(PresenceChange),
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    channel: &'static str,
    to: UserId,
    payload: &'a Event,
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Self::ChatMessage(_) => Channel::Chat,
            Self::MessageDeleted(_) => Channel::ChatDelete,
            Self::ReadReceipt(_) => Channel::ChatSeen,
            Self::NotificationPing(_) => Channel::Notifications,
            Self::NotificationNew(_) => Channel::NotificationsNew,
            Self::NotificationDeleted(_) => Channel::NotificationsDelete,
            Self::NotificationMarkedRead(_) => Channel::NotificationsRead,
            Self::PresenceChange(_) => Channel::Status,
        }
    }

    /// Serialize this event as the text frame delivered to `to`.
    pub fn encode(&self, to: UserId) -> serde_json::Result<String> {
        serde_json::to_string(&OutboundFrame { channel: self.channel().as_str(), to, payload: self })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
