// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide map from user to that user's live connections.
//!
//! Structural changes take the write lock; lookups take the read lock and
//! return a snapshot of `Arc` handles, so enqueueing never happens while the
//! lock is held and enumeration never blocks other enumeration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::live::connection::Connection;
use crate::model::{SessionId, UserId};

/// Population change caused by an add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The user went from zero live connections to one.
    CameOnline,
    /// The user's last live connection was removed.
    WentOffline,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct Registry {
    users: RwLock<HashMap<UserId, Vec<Arc<Connection>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its user. Callers guarantee each
    /// connection is added once.
    pub fn add(&self, conn: Arc<Connection>) -> Transition {
        let user_id = conn.user_id();
        let mut users = self.users.write();
        let conns = users.entry(user_id).or_default();
        conns.push(conn);
        let count = conns.len();
        drop(users);

        debug!(%user_id, connections = count, "connection registered");
        if count == 1 {
            Transition::CameOnline
        } else {
            Transition::Unchanged
        }
    }

    /// Remove a specific connection. Unknown connections are ignored, so a
    /// duplicate cleanup is harmless.
    pub fn remove(&self, conn: &Connection) -> Transition {
        let user_id = conn.user_id();
        let mut users = self.users.write();
        let Some(conns) = users.get_mut(&user_id) else {
            return Transition::Unchanged;
        };
        let before = conns.len();
        conns.retain(|c| c.id() != conn.id());
        if conns.len() == before {
            return Transition::Unchanged;
        }
        let remaining = conns.len();
        if remaining == 0 {
            users.remove(&user_id);
        }
        drop(users);

        debug!(%user_id, connection_id = %conn.id(), connections = remaining, "connection unregistered");
        if remaining == 0 {
            Transition::WentOffline
        } else {
            Transition::Unchanged
        }
    }

    /// Snapshot of a user's live connections in registration order.
    pub fn lookup(&self, user_id: UserId) -> Vec<Arc<Connection>> {
        self.users.read().get(&user_id).cloned().unwrap_or_default()
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.users.read().contains_key(&user_id)
    }

    /// Every user holding at least one live connection.
    pub fn online_user_ids(&self) -> HashSet<UserId> {
        self.users.read().keys().copied().collect()
    }

    /// Connections opened under one login session, across all its users'
    /// tabs.
    pub fn connections_for_session(&self, session_id: &SessionId) -> Vec<Arc<Connection>> {
        self.users
            .read()
            .values()
            .flatten()
            .filter(|c| c.session_id() == session_id)
            .cloned()
            .collect()
    }

    pub fn all_connections(&self) -> Vec<Arc<Connection>> {
        self.users.read().values().flatten().cloned().collect()
    }

    pub fn connection_count(&self) -> usize {
        self.users.read().values().map(Vec::len).sum()
    }

    pub fn online_count(&self) -> usize {
        self.users.read().len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
