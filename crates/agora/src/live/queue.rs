// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::event::Event;

/// Outcome of [`OutboundQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    Queued,
    /// The queue was full; the oldest pending event was discarded to make
    /// room.
    Evicted,
    /// The connection is closing; the event was discarded.
    Closed,
}

/// Bounded single-consumer FIFO of pending events for one connection.
///
/// Producers never wait: when the queue is at capacity the oldest pending
/// event is dropped and counted, so the latest state (presence, unread
/// counts) always reaches a slow client eventually.
#[derive(Debug)]
pub struct OutboundQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    items: VecDeque<Arc<Event>>,
    closed: bool,
}

impl OutboundQueue {
    /// Create a queue holding at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner { items: VecDeque::with_capacity(capacity), closed: false }),
            notify: Notify::new(),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, event: Arc<Event>) -> Push {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Push::Closed;
            }
            let outcome = if inner.items.len() >= self.capacity {
                inner.items.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Push::Evicted
            } else {
                Push::Queued
            };
            inner.items.push_back(event);
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Wait for the next event. Returns `None` once the queue is closed;
    /// events still pending at that point are discarded.
    pub async fn pop(&self) -> Option<Arc<Event>> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock();
                if inner.closed {
                    return None;
                }
                if let Some(event) = inner.items.pop_front() {
                    return Some(event);
                }
            }
            notified.await;
        }
    }

    /// Take the next event without waiting.
    pub fn try_pop(&self) -> Option<Arc<Event>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        inner.items.pop_front()
    }

    /// Close the queue and wake the consumer. Idempotent.
    pub fn close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.items.clear();
        }
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events evicted because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
