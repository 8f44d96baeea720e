// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-to-server control frames.
//!
//! A frame is a JSON object with a `channel` discriminator, a destination
//! user `to` and a channel-specific `payload`. The discriminator is decoded
//! first; the payload is then decoded according to it. Browsers send `to`
//! both as a number and as a numeric string, so both are accepted.

use std::fmt;

use serde::Deserialize;

use crate::model::{ChatId, ChatMessage, UserId};

/// A fully parsed client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    /// `chat`: relay a chat message to `to`.
    ChatForward { to: UserId, message: ChatMessage },
    /// `notification`: ask `to` to refresh notifications.
    NotificationForward { to: UserId, payload: serde_json::Value },
    /// `notifications-read`: tell `to` that all notifications were read.
    MarkAllReadForward { to: UserId },
    /// `chat-seen`: tell `to` that the sender has read `chat_id`.
    ChatSeen { to: UserId, chat_id: ChatId },
    /// Any other discriminator. Ignored for forward compatibility.
    Unknown(String),
}

/// Why a text frame could not be turned into a [`ClientFrame`].
#[derive(Debug)]
pub enum FrameError {
    /// Not a JSON object with a string `channel`. The stream is treated as
    /// desynchronized and the connection is closed.
    Malformed(serde_json::Error),
    /// Known channel with a missing or unusable field. Only this frame is
    /// dropped.
    Invalid { channel: String, reason: &'static str },
}

impl FrameError {
    /// Whether the connection must be closed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed frame: {e}"),
            Self::Invalid { channel, reason } => write!(f, "invalid {channel} frame: {reason}"),
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Debug, Deserialize)]
struct RawFrame {
    channel: String,
    #[serde(default)]
    to: serde_json::Value,
    #[serde(default)]
    chat_id: serde_json::Value,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Accept `12` or `"12"`.
fn int_field(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse one inbound text frame.
pub fn parse_frame(text: &str) -> Result<ClientFrame, FrameError> {
    let raw: RawFrame = serde_json::from_str(text).map_err(FrameError::Malformed)?;

    let invalid = |reason| FrameError::Invalid { channel: raw.channel.clone(), reason };
    let to = || int_field(&raw.to).map(UserId);

    match raw.channel.as_str() {
        "chat" => {
            let to = to().ok_or_else(|| invalid("missing destination"))?;
            let message = ChatMessage::deserialize(&raw.payload)
                .map_err(|_| invalid("payload is not a chat message"))?;
            Ok(ClientFrame::ChatForward { to, message })
        }
        "notification" => {
            let to = to().ok_or_else(|| invalid("missing destination"))?;
            Ok(ClientFrame::NotificationForward { to, payload: raw.payload.clone() })
        }
        "notifications-read" => {
            let to = to().ok_or_else(|| invalid("missing destination"))?;
            Ok(ClientFrame::MarkAllReadForward { to })
        }
        "chat-seen" => {
            let to = to().ok_or_else(|| invalid("missing destination"))?;
            let chat_id = int_field(&raw.chat_id)
                .or_else(|| raw.payload.get("chat_id").and_then(int_field))
                .ok_or_else(|| invalid("missing chat_id"))?;
            Ok(ClientFrame::ChatSeen { to, chat_id })
        }
        other => Ok(ClientFrame::Unknown(other.to_owned())),
    }
}

#[cfg(test)]
#[path = "inbound_tests.rs"]
mod tests;
