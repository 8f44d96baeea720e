// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stand-in for the relational and session stores.
//!
//! Seeded from a JSON fixture so the binary can run without a database.
//! Every operation completes synchronously under one lock; the returned
//! futures are already resolved.

use std::collections::HashMap;
use std::future::ready;
use std::path::Path;

use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;

use super::{
    AuthError, ChatStore, NotificationStore, RelationshipStore, ResolveFuture, SessionStore,
    StoreFuture,
};
use crate::model::{
    epoch_ms, ChatId, ChatMessage, ChatSummary, Contact, MessageDraft, NewNotification,
    Notification, NotificationId, SessionId, Unsent, UserId,
};

/// Seed data for [`MemoryStore`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<FixtureUser>,
    pub sessions: Vec<FixtureSession>,
    pub follows: Vec<FixtureFollow>,
    pub chats: Vec<FixtureChat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureSession {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureFollow {
    pub follower: UserId,
    pub following: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureChat {
    pub id: ChatId,
    pub members: [UserId; 2],
}

#[derive(Debug, Default)]
struct Inner {
    names: HashMap<UserId, String>,
    sessions: HashMap<String, (UserId, SessionId)>,
    follows: Vec<(UserId, UserId)>,
    chats: HashMap<ChatId, [UserId; 2]>,
    messages: Vec<ChatMessage>,
    notifications: Vec<Notification>,
    next_message: u64,
    next_notification: NotificationId,
}

impl Inner {
    fn chat_between(&self, a: UserId, b: UserId) -> Option<ChatId> {
        self.chats
            .iter()
            .filter(|(_, m)| (m[0] == a && m[1] == b) || (m[0] == b && m[1] == a))
            .map(|(id, _)| *id)
            .min()
    }

    fn other_party(&self, current: UserId, chat_id: ChatId) -> Option<UserId> {
        let [a, b] = *self.chats.get(&chat_id)?;
        if a == current {
            Some(b)
        } else if b == current {
            Some(a)
        } else {
            None
        }
    }

    fn last_message(&self, chat_id: ChatId) -> Option<ChatMessage> {
        self.messages.iter().rev().find(|m| m.chat_id == chat_id).cloned()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for user in fixture.users {
                inner.names.insert(user.id, user.name);
            }
            for session in fixture.sessions {
                let id = SessionId::new(format!("sess-{}", uuid::Uuid::new_v4()));
                inner.sessions.insert(session.token, (session.user_id, id));
            }
            inner.follows = fixture.follows.into_iter().map(|f| (f.follower, f.following)).collect();
            for chat in fixture.chats {
                inner.chats.insert(chat.id, chat.members);
            }
        }
        store
    }

    /// Load a JSON fixture file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: Fixture = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Issue a new login session for `user` and return its cookie token.
    pub fn login(&self, user: UserId) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let id = SessionId::new(format!("sess-{}", uuid::Uuid::new_v4()));
        self.inner.lock().sessions.insert(token.clone(), (user, id));
        token
    }

    pub fn add_user(&self, id: UserId, name: impl Into<String>) {
        self.inner.lock().names.insert(id, name.into());
    }

    pub fn follow(&self, follower: UserId, following: UserId) {
        self.inner.lock().follows.push((follower, following));
    }

    pub fn add_chat(&self, id: ChatId, a: UserId, b: UserId) {
        self.inner.lock().chats.insert(id, [a, b]);
    }
}

impl SessionStore for MemoryStore {
    fn resolve<'a>(&'a self, token: &'a str) -> ResolveFuture<'a> {
        let found = self.inner.lock().sessions.get(token).cloned();
        Box::pin(ready(found.ok_or(AuthError::InvalidSession)))
    }

    fn revoke<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool> {
        let existed = self.inner.lock().sessions.remove(token).is_some();
        Box::pin(ready(Ok(existed)))
    }
}

impl ChatStore for MemoryStore {
    fn persist_message<'a>(
        &'a self,
        sender: UserId,
        chat_id: ChatId,
        draft: MessageDraft,
    ) -> StoreFuture<'a, ChatMessage> {
        let mut inner = self.inner.lock();
        let result = if inner.other_party(sender, chat_id).is_none() {
            Err(anyhow::anyhow!("user {sender} is not a member of chat {chat_id}"))
        } else {
            inner.next_message += 1;
            let message = ChatMessage {
                id: format!("msg-{}", inner.next_message),
                chat_id,
                sender_id: sender,
                content: draft.content,
                kind: draft.kind,
                reply_to: draft.reply_to,
                is_read: false,
                is_own: false,
                created_at: epoch_ms(),
            };
            inner.messages.push(message.clone());
            Ok(message)
        };
        Box::pin(ready(result))
    }

    fn other_party(&self, current: UserId, chat_id: ChatId) -> StoreFuture<'_, Option<UserId>> {
        let peer = self.inner.lock().other_party(current, chat_id);
        Box::pin(ready(Ok(peer)))
    }

    fn mark_seen(&self, chat_id: ChatId, reader: UserId) -> StoreFuture<'_, Option<ChatMessage>> {
        let mut inner = self.inner.lock();
        for message in inner.messages.iter_mut() {
            if message.chat_id == chat_id && message.sender_id != reader {
                message.is_read = true;
            }
        }
        let last = inner.last_message(chat_id);
        Box::pin(ready(Ok(last)))
    }

    fn unsend<'a>(&'a self, sender: UserId, message_id: &'a str) -> StoreFuture<'a, Option<Unsent>> {
        let mut inner = self.inner.lock();
        let pos = inner.messages.iter().position(|m| m.id == message_id && m.sender_id == sender);
        let unsent = pos.map(|pos| {
            let removed = inner.messages.remove(pos);
            Unsent { chat_id: removed.chat_id, new_last: inner.last_message(removed.chat_id) }
        });
        Box::pin(ready(Ok(unsent)))
    }

    fn chats_for(&self, user: UserId) -> StoreFuture<'_, Vec<ChatSummary>> {
        let inner = self.inner.lock();
        let mut summaries: Vec<ChatSummary> = inner
            .chats
            .keys()
            .filter_map(|&id| {
                let peer = inner.other_party(user, id)?;
                let unread = inner
                    .messages
                    .iter()
                    .filter(|m| m.chat_id == id && m.sender_id != user && !m.is_read)
                    .count();
                Some(ChatSummary {
                    id,
                    peer_id: peer,
                    name: inner.names.get(&peer).cloned().unwrap_or_default(),
                    last_message: inner.last_message(id).map(|m| m.content),
                    unread_count: u32::try_from(unread).unwrap_or(u32::MAX),
                    is_online: None,
                })
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        Box::pin(ready(Ok(summaries)))
    }
}

impl NotificationStore for MemoryStore {
    fn persist(&self, new: NewNotification) -> StoreFuture<'_, Notification> {
        let mut inner = self.inner.lock();
        inner.next_notification += 1;
        let notification = Notification {
            id: inner.next_notification,
            user_id: new.target,
            actor_id: new.actor,
            kind: new.kind,
            content: new.content,
            is_read: false,
            created_at: epoch_ms(),
        };
        inner.notifications.push(notification.clone());
        Box::pin(ready(Ok(notification)))
    }

    fn delete<'a>(
        &'a self,
        actor: UserId,
        target: UserId,
        kind: &'a str,
    ) -> StoreFuture<'a, bool> {
        let mut inner = self.inner.lock();
        let before = inner.notifications.len();
        inner
            .notifications
            .retain(|n| !(n.actor_id == actor && n.user_id == target && n.kind == kind));
        let deleted = inner.notifications.len() != before;
        Box::pin(ready(Ok(deleted)))
    }

    fn mark_read(&self, target: UserId, id: NotificationId) -> StoreFuture<'_, bool> {
        let mut inner = self.inner.lock();
        let found = inner.notifications.iter_mut().find(|n| n.id == id && n.user_id == target);
        let changed = match found {
            Some(n) => {
                n.is_read = true;
                true
            }
            None => false,
        };
        Box::pin(ready(Ok(changed)))
    }

    fn mark_all_read(&self, target: UserId) -> StoreFuture<'_, usize> {
        let mut inner = self.inner.lock();
        let mut changed = 0;
        for n in inner.notifications.iter_mut().filter(|n| n.user_id == target && !n.is_read) {
            n.is_read = true;
            changed += 1;
        }
        Box::pin(ready(Ok(changed)))
    }

    fn list(&self, target: UserId) -> StoreFuture<'_, Vec<Notification>> {
        let list = self
            .inner
            .lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == target)
            .rev()
            .cloned()
            .collect();
        Box::pin(ready(Ok(list)))
    }
}

impl RelationshipStore for MemoryStore {
    fn contacts(&self, user: UserId) -> StoreFuture<'_, Vec<Contact>> {
        let inner = self.inner.lock();
        let mut peers: Vec<UserId> = inner
            .follows
            .iter()
            .filter_map(|&(follower, following)| {
                if follower == user {
                    Some(following)
                } else if following == user {
                    Some(follower)
                } else {
                    None
                }
            })
            .filter(|&peer| peer != user)
            .collect();
        peers.sort();
        peers.dedup();
        let contacts = peers
            .into_iter()
            .map(|peer| Contact { user_id: peer, chat_id: inner.chat_between(user, peer) })
            .collect();
        Box::pin(ready(Ok(contacts)))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
