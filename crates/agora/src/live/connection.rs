// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::event::Event;
use crate::live::queue::{OutboundQueue, Push};
use crate::model::{ConnectionId, SessionId, UserId};

/// Lifecycle of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnState {
    Connecting = 0,
    Registered = 1,
    Active = 2,
    Closing = 3,
    Closed = 4,
}

impl ConnState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Registered,
            2 => Self::Active,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Registered => "registered",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

/// One accepted live connection.
///
/// Owned by its read/write loop pair. The registry and router hold clones of
/// the `Arc` only to enqueue events and to request a close; they never touch
/// the transport.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: UserId,
    session_id: SessionId,
    queue: OutboundQueue,
    cancel: CancellationToken,
    state: AtomicU8,
    torn_down: AtomicBool,
}

impl Connection {
    pub fn new(user_id: UserId, session_id: SessionId, queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::generate(),
            user_id,
            session_id,
            queue: OutboundQueue::new(queue_capacity),
            cancel: CancellationToken::new(),
            state: AtomicU8::new(ConnState::Connecting as u8),
            torn_down: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn queue(&self) -> &OutboundQueue {
        &self.queue
    }

    pub fn enqueue(&self, event: Arc<Event>) -> Push {
        self.queue.push(event)
    }

    pub fn state(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: ConnState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`; fails if the state has already moved on.
    pub(crate) fn advance(&self, from: ConnState, to: ConnState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Ask both loops to stop. Safe to call any number of times from any
    /// task; the loops perform the actual teardown.
    pub fn request_close(&self) {
        self.cancel.cancel();
    }

    pub fn is_close_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Single-shot teardown guard: returns `true` for exactly one caller.
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.torn_down.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
