// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live-update layer: connection registry, fanout and presence.

pub mod connection;
pub mod inbound;
pub mod presence;
pub mod queue;
pub mod registry;
pub mod router;
pub mod session;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::event::Event;
use crate::model::{ConnectionId, SessionId, UserId};
use crate::store::{ChatStore, Stores};

pub use connection::{ConnState, Connection};
pub use presence::PresenceTracker;
pub use registry::{Registry, Transition};
pub use router::Router;

/// Per-connection tuning shared by every session.
#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    pub queue_capacity: usize,
    /// Server ping cadence. `None` disables pings.
    pub ping_interval: Option<Duration>,
    /// Close a connection after this long without an inbound frame.
    pub idle_timeout: Option<Duration>,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            ping_interval: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// Process-wide handle to the live layer. Created once at startup and
/// shared by the upgrade handler and every REST handler.
///
/// A connection is tracked in `opening` from [`LiveHub::open`] until it is
/// in the registry, so a logout never misses a tab that is still
/// registering.
pub struct LiveHub {
    pub registry: Arc<Registry>,
    pub router: Arc<Router>,
    pub presence: Arc<PresenceTracker>,
    pub settings: LiveSettings,
    chats: Arc<dyn ChatStore>,
    opening: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
}

impl LiveHub {
    pub fn new(stores: &Stores, settings: LiveSettings) -> Self {
        let registry = Arc::new(Registry::new());
        let router = Arc::new(Router::new(Arc::clone(&registry)));
        let presence = Arc::new(PresenceTracker::new(
            Arc::clone(&registry),
            Arc::clone(&router),
            Arc::clone(&stores.relationships),
        ));
        Self {
            registry,
            router,
            presence,
            settings,
            chats: Arc::clone(&stores.chats),
            opening: Mutex::new(HashMap::new()),
        }
    }

    /// Create a connection record for a freshly authenticated client.
    pub fn open(&self, user_id: UserId, session_id: SessionId) -> Arc<Connection> {
        let conn = Connection::new(user_id, session_id, self.settings.queue_capacity);
        self.opening.lock().insert(conn.id().clone(), Arc::clone(&conn));
        conn
    }

    /// Stop tracking `conn` as opening. Called once it is registered, or
    /// when it is abandoned before registration.
    pub(crate) fn settle(&self, conn: &Connection) {
        self.opening.lock().remove(conn.id());
    }

    pub(crate) fn chats(&self) -> &dyn ChatStore {
        &*self.chats
    }

    /// Push `event` to every live connection of `target` except those of
    /// `exclude`. Returns the number of connections reached.
    pub fn dispatch(&self, target: UserId, event: Event, exclude: Option<&SessionId>) -> usize {
        self.router.dispatch(target, event, exclude)
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry.is_online(user_id)
    }

    /// Every user currently holding at least one live connection.
    pub fn online_user_ids(&self) -> HashSet<UserId> {
        self.registry.online_user_ids()
    }

    /// Ask every connection opened under `session_id` to close, including
    /// ones still registering. Returns how many were asked.
    pub fn close_session(&self, session_id: &SessionId) -> usize {
        // Opening first: a connection leaves `opening` only after it is in
        // the registry.
        let mut conns: HashMap<ConnectionId, Arc<Connection>> = self
            .opening
            .lock()
            .values()
            .filter(|c| c.session_id() == session_id)
            .map(|c| (c.id().clone(), Arc::clone(c)))
            .collect();
        for conn in self.registry.connections_for_session(session_id) {
            conns.entry(conn.id().clone()).or_insert(conn);
        }
        for conn in conns.values() {
            conn.request_close();
        }
        if !conns.is_empty() {
            info!(%session_id, connections = conns.len(), "closing connections of ended session");
        }
        conns.len()
    }

    /// Ask every live or registering connection to close.
    pub fn close_all(&self) -> usize {
        let mut conns: HashMap<ConnectionId, Arc<Connection>> = self
            .opening
            .lock()
            .iter()
            .map(|(id, c)| (id.clone(), Arc::clone(c)))
            .collect();
        for conn in self.registry.all_connections() {
            conns.entry(conn.id().clone()).or_insert(conn);
        }
        for conn in conns.values() {
            conn.request_close();
        }
        conns.len()
    }
}

impl std::fmt::Debug for LiveHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHub")
            .field("registry", &self.registry)
            .field("presence", &self.presence)
            .field("settings", &self.settings)
            .field("opening", &self.opening.lock().len())
            .finish_non_exhaustive()
    }
}
