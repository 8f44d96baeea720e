// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fanout of one event to every live connection of a user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::event::Event;
use crate::live::queue::Push;
use crate::live::registry::Registry;
use crate::model::{SessionId, UserId};

#[derive(Debug)]
pub struct Router {
    registry: Arc<Registry>,
    dropped: AtomicU64,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry, dropped: AtomicU64::new(0) }
    }

    /// Enqueue `event` on every live connection of `target`, skipping
    /// connections opened under `exclude`.
    ///
    /// Never waits on a consumer: a full queue evicts its oldest event.
    /// Returns the number of connections the event was queued on. A target
    /// with no connections is a no-op.
    pub fn dispatch(&self, target: UserId, event: Event, exclude: Option<&SessionId>) -> usize {
        let conns = self.registry.lookup(target);
        if conns.is_empty() {
            return 0;
        }

        let event = Arc::new(event);
        let mut queued = 0;
        for conn in &conns {
            if exclude.is_some_and(|s| conn.session_id() == s) {
                continue;
            }
            match conn.enqueue(Arc::clone(&event)) {
                Push::Queued => queued += 1,
                Push::Evicted => {
                    queued += 1;
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    let dropped = conn.queue().dropped();
                    if dropped == 1 {
                        warn!(
                            user_id = %target,
                            connection_id = %conn.id(),
                            dropped,
                            "slow consumer, evicting oldest events"
                        );
                    } else {
                        debug!(user_id = %target, connection_id = %conn.id(), dropped, "evicted oldest event");
                    }
                }
                Push::Closed => {}
            }
        }
        queued
    }

    /// Total events evicted across all connections since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
