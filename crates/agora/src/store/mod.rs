// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interfaces to the relational store and the session store.
//!
//! The live layer never owns users, chats or notifications; it reads and
//! writes them through these traits. Futures are boxed so the traits stay
//! object-safe and can be shared as `Arc<dyn ...>`.

pub mod memory;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::model::{
    ChatId, ChatMessage, ChatSummary, Contact, MessageDraft, NewNotification, Notification,
    NotificationId, SessionId, Unsent, UserId,
};

pub use memory::MemoryStore;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Boxed future returned by [`SessionStore::resolve`].
pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(UserId, SessionId), AuthError>> + Send + 'a>>;

/// Why a request could not be tied to a logged-in user.
#[derive(Debug)]
pub enum AuthError {
    /// No session cookie on the request.
    MissingCookie,
    /// Cookie present but unknown, expired or revoked.
    InvalidSession,
    Backend(anyhow::Error),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCookie => f.write_str("missing session cookie"),
            Self::InvalidSession => f.write_str("invalid session"),
            Self::Backend(e) => write!(f, "session lookup failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

pub trait SessionStore: Send + Sync {
    /// Resolve a session token to its user and login session.
    fn resolve<'a>(&'a self, token: &'a str) -> ResolveFuture<'a>;

    /// Invalidate a session token. Returns whether it existed.
    fn revoke<'a>(&'a self, token: &'a str) -> StoreFuture<'a, bool>;
}

pub trait ChatStore: Send + Sync {
    /// Persist a message from `sender` in `chat_id`, returning the stored row.
    fn persist_message<'a>(
        &'a self,
        sender: UserId,
        chat_id: ChatId,
        draft: MessageDraft,
    ) -> StoreFuture<'a, ChatMessage>;

    /// The participant of `chat_id` who is not `current`. `None` when the
    /// chat does not exist or `current` is not a participant.
    fn other_party(&self, current: UserId, chat_id: ChatId) -> StoreFuture<'_, Option<UserId>>;

    /// Mark every message of `chat_id` not sent by `reader` as read. Returns
    /// the conversation's latest message.
    fn mark_seen(&self, chat_id: ChatId, reader: UserId) -> StoreFuture<'_, Option<ChatMessage>>;

    /// Delete a message sent by `sender`. `None` when no such message.
    fn unsend<'a>(&'a self, sender: UserId, message_id: &'a str) -> StoreFuture<'a, Option<Unsent>>;

    fn chats_for(&self, user: UserId) -> StoreFuture<'_, Vec<ChatSummary>>;
}

pub trait NotificationStore: Send + Sync {
    fn persist(&self, new: NewNotification) -> StoreFuture<'_, Notification>;

    /// Delete the notification `actor` caused for `target` of kind `kind`.
    fn delete<'a>(
        &'a self,
        actor: UserId,
        target: UserId,
        kind: &'a str,
    ) -> StoreFuture<'a, bool>;

    fn mark_read(&self, target: UserId, id: NotificationId) -> StoreFuture<'_, bool>;

    /// Returns the number of notifications that changed.
    fn mark_all_read(&self, target: UserId) -> StoreFuture<'_, usize>;

    fn list(&self, target: UserId) -> StoreFuture<'_, Vec<Notification>>;
}

pub trait RelationshipStore: Send + Sync {
    /// Users related to `user` by follow in either direction, each with the
    /// conversation they share with `user`, if any.
    fn contacts(&self, user: UserId) -> StoreFuture<'_, Vec<Contact>>;
}

/// The collaborator set handed to the transport layer.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub chats: Arc<dyn ChatStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub relationships: Arc<dyn RelationshipStore>,
}

impl Stores {
    /// Back every interface with one in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            sessions: Arc::clone(&store) as Arc<dyn SessionStore>,
            chats: Arc::clone(&store) as Arc<dyn ChatStore>,
            notifications: Arc::clone(&store) as Arc<dyn NotificationStore>,
            relationships: store,
        }
    }
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
