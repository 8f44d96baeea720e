// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Online/offline transitions and their announcement to contacts.
//!
//! A user's registry add or remove and the announcement it causes run under
//! a per-user gate, so for any observer the `status` events of one user
//! alternate online/offline and match the order of the transitions. The
//! gate is async and held across the contact lookup; the registry lock is
//! never held across it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::event::{Event, PresenceChange};
use crate::live::connection::Connection;
use crate::live::registry::{Registry, Transition};
use crate::live::router::Router;
use crate::model::UserId;
use crate::store::RelationshipStore;

type Gate = Arc<tokio::sync::Mutex<()>>;

pub struct PresenceTracker {
    registry: Arc<Registry>,
    router: Arc<Router>,
    relationships: Arc<dyn RelationshipStore>,
    gates: Mutex<HashMap<UserId, Gate>>,
}

impl PresenceTracker {
    pub fn new(
        registry: Arc<Registry>,
        router: Arc<Router>,
        relationships: Arc<dyn RelationshipStore>,
    ) -> Self {
        Self { registry, router, relationships, gates: Mutex::new(HashMap::new()) }
    }

    /// Register `conn` and, if it is the user's first, announce them online.
    pub async fn connect(&self, conn: Arc<Connection>) -> Transition {
        let user_id = conn.user_id();
        let gate = self.gate(user_id);
        let transition = {
            let _held = gate.lock().await;
            let transition = self.registry.add(conn);
            if transition == Transition::CameOnline {
                self.announce(user_id, true).await;
            }
            transition
        };
        self.release(user_id, gate);
        transition
    }

    /// Unregister `conn` and, if it was the user's last, announce them
    /// offline. Removing an unknown connection does nothing.
    pub async fn disconnect(&self, conn: &Connection) -> Transition {
        let user_id = conn.user_id();
        let gate = self.gate(user_id);
        let transition = {
            let _held = gate.lock().await;
            let transition = self.registry.remove(conn);
            if transition == Transition::WentOffline {
                self.announce(user_id, false).await;
            }
            transition
        };
        self.release(user_id, gate);
        transition
    }

    /// Tell every online contact of `user_id` about its new status.
    async fn announce(&self, user_id: UserId, online: bool) {
        let contacts = match self.relationships.contacts(user_id).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(%user_id, err = %e, "contact lookup failed, presence not announced");
                return;
            }
        };

        let mut notified = 0;
        for contact in contacts {
            if !self.registry.is_online(contact.user_id) {
                continue;
            }
            let event = Event::PresenceChange(PresenceChange {
                user: contact.chat_id,
                peer_id: user_id,
                status: online,
            });
            if self.router.dispatch(contact.user_id, event, None) > 0 {
                notified += 1;
            }
        }
        debug!(%user_id, online, notified, "presence announced");
    }

    fn gate(&self, user_id: UserId) -> Gate {
        Arc::clone(self.gates.lock().entry(user_id).or_default())
    }

    /// Drop the gate entry once no other task holds a handle to it.
    ///
    /// Handles are only cloned and dropped under the map lock, so the last
    /// releaser always sees the map's reference alone.
    fn release(&self, user_id: UserId, gate: Gate) {
        let mut gates = self.gates.lock();
        drop(gate);
        if gates.get(&user_id).is_some_and(|g| Arc::strong_count(g) == 1) {
            gates.remove(&user_id);
        }
    }

    #[cfg(test)]
    fn gate_count(&self) -> usize {
        self.gates.lock().len()
    }
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker").field("gates", &self.gates.lock().len()).finish()
    }
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
