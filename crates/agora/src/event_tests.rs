// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn message() -> ChatMessage {
    ChatMessage {
        id: "m-1".to_owned(),
        chat_id: 7,
        sender_id: UserId(1),
        content: "hello".to_owned(),
        kind: "text".to_owned(),
        reply_to: None,
        is_read: false,
        is_own: false,
        created_at: 1_700_000_000_000,
    }
}

#[yare::parameterized(
    chat = { Event::ChatMessage(message()), "chat" },
    chat_delete = {
        Event::MessageDeleted(MessageDeleted { chat_id: 7, message_id: "m-1".to_owned(), new_message: None }),
        "chat-delete"
    },
    chat_seen = {
        Event::ReadReceipt(ReadReceipt { chat_id: 7, reader_id: UserId(2), message: None, timestamp: 0 }),
        "chat-seen"
    },
    ping = {
        Event::NotificationPing(NotificationPing { from: UserId(1), data: serde_json::Value::Null }),
        "notifications"
    },
    deleted = {
        Event::NotificationDeleted(NotificationDeleted { actor_id: UserId(1), kind: "follow".to_owned() }),
        "notifications-delete"
    },
    read = { Event::NotificationMarkedRead(NotificationMarkedRead { id: None }), "notifications-read" },
    status = {
        Event::PresenceChange(PresenceChange { user: Some(7), peer_id: UserId(1), status: true }),
        "status"
    },
)]
fn channel_names(event: Event, expected: &str) {
    assert_eq!(event.channel().as_str(), expected);
}

#[test]
fn chat_frame_wraps_payload() -> anyhow::Result<()> {
    let text = Event::ChatMessage(message()).encode(UserId(2))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(value["channel"], "chat");
    assert_eq!(value["to"], 2);
    assert_eq!(value["payload"]["chat_id"], 7);
    assert_eq!(value["payload"]["content"], "hello");
    assert_eq!(value["payload"]["type"], "text");
    assert!(value["payload"].get("reply_to").is_none());
    Ok(())
}

#[test]
fn status_frame_carries_conversation_and_flag() -> anyhow::Result<()> {
    let event = Event::PresenceChange(PresenceChange { user: Some(42), peer_id: UserId(9), status: false });
    let value: serde_json::Value = serde_json::from_str(&event.encode(UserId(3))?)?;
    assert_eq!(value["channel"], "status");
    assert_eq!(value["payload"]["user"], 42);
    assert_eq!(value["payload"]["status"], false);
    assert_eq!(value["payload"]["peer_id"], 9);
    Ok(())
}

#[test]
fn new_notification_frame() -> anyhow::Result<()> {
    let event = Event::NotificationNew(Notification {
        id: 5,
        user_id: UserId(3),
        actor_id: UserId(1),
        kind: "follow_request".to_owned(),
        content: "wants to follow you".to_owned(),
        is_read: false,
        created_at: 10,
    });
    let value: serde_json::Value = serde_json::from_str(&event.encode(UserId(3))?)?;
    assert_eq!(value["channel"], "notifications-new");
    assert_eq!(value["payload"]["id"], 5);
    assert_eq!(value["payload"]["type"], "follow_request");
    Ok(())
}
