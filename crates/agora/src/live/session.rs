// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read/write loop pair driving one live connection.
//!
//! The write loop is the only task that touches the sink and the read loop
//! the only one that touches the stream. Either loop ending requests a
//! close of the other; whichever gets there first runs teardown.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::event::{Event, NotificationMarkedRead, NotificationPing, ReadReceipt};
use crate::live::connection::{ConnState, Connection};
use crate::live::inbound::{parse_frame, ClientFrame};
use crate::live::LiveHub;
use crate::model::epoch_ms;

/// Upper bound on flushing the close handshake once a connection ends.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Drive `conn` over a split transport until either side ends it.
///
/// Registers the connection (announcing the user online if it is their
/// first), runs both loops, and returns once teardown has completed. A
/// connection whose close was requested before registration is never
/// registered.
pub async fn run<S, R, E>(hub: Arc<LiveHub>, conn: Arc<Connection>, mut sink: S, stream: R)
where
    S: Sink<Message> + Send + Unpin + 'static,
    S::Error: Display + Send,
    R: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    if conn.is_close_requested() {
        abandon(&hub, &conn, &mut sink).await;
        return;
    }
    hub.presence.connect(Arc::clone(&conn)).await;
    // A close requested from here on reaches the loops through the token.
    hub.settle(&conn);
    conn.advance(ConnState::Connecting, ConnState::Registered);
    info!(
        user_id = %conn.user_id(),
        session_id = %conn.session_id(),
        connection_id = %conn.id(),
        "connection opened"
    );

    let writer = tokio::spawn(write_loop(Arc::clone(&hub), Arc::clone(&conn), sink));
    let reader = tokio::spawn(read_loop(Arc::clone(&hub), Arc::clone(&conn), stream));
    conn.advance(ConnState::Registered, ConnState::Active);

    for (name, task) in [("writer", writer), ("reader", reader)] {
        if let Err(e) = task.await {
            warn!(
                connection_id = %conn.id(),
                state = conn.state().as_str(),
                err = %e,
                "{name} task failed"
            );
        }
    }
    // No-op unless a loop died before reaching its own teardown.
    teardown(&conn, &hub).await;
}

/// Close a connection that never reached the registry.
async fn abandon<S>(hub: &LiveHub, conn: &Connection, sink: &mut S)
where
    S: Sink<Message> + Unpin,
{
    hub.settle(conn);
    if conn.begin_teardown() {
        conn.queue().close();
        conn.set_state(ConnState::Closed);
    }
    let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
    debug!(connection_id = %conn.id(), "connection closed before registration");
}

/// Remove `conn` from the live layer. Only the first call does anything;
/// returns whether this call performed the teardown.
pub async fn teardown(conn: &Connection, hub: &LiveHub) -> bool {
    if !conn.begin_teardown() {
        return false;
    }
    conn.set_state(ConnState::Closing);
    conn.request_close();
    conn.queue().close();
    hub.presence.disconnect(conn).await;
    conn.set_state(ConnState::Closed);
    info!(
        user_id = %conn.user_id(),
        connection_id = %conn.id(),
        dropped = conn.queue().dropped(),
        "connection closed"
    );
    true
}

async fn write_loop<S>(hub: Arc<LiveHub>, conn: Arc<Connection>, mut sink: S)
where
    S: Sink<Message> + Send + Unpin,
    S::Error: Display + Send,
{
    let mut ping = hub.settings.ping_interval.map(|period| {
        let mut ping = tokio::time::interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping
    });

    let reason = loop {
        let msg = tokio::select! {
            _ = conn.cancelled() => break "close requested",
            event = conn.queue().pop() => match event {
                Some(event) => match event.encode(conn.user_id()) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        warn!(connection_id = %conn.id(), err = %e, "event encoding failed");
                        continue;
                    }
                },
                None => break "queue closed",
            },
            _ = tick(&mut ping) => Message::Ping(Bytes::new()),
        };

        let sent = tokio::select! {
            _ = conn.cancelled() => break "close requested",
            sent = sink.send(msg) => sent,
        };
        if let Err(e) = sent {
            debug!(connection_id = %conn.id(), err = %e, "write failed");
            break "write failed";
        }
    };

    let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
    debug!(connection_id = %conn.id(), reason, "write loop ended");
    conn.request_close();
    teardown(&conn, &hub).await;
}

async fn tick(ping: &mut Option<Interval>) {
    match ping {
        Some(ping) => {
            ping.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn read_loop<R, E>(hub: Arc<LiveHub>, conn: Arc<Connection>, mut stream: R)
where
    R: Stream<Item = Result<Message, E>> + Send + Unpin,
    E: Display + Send,
{
    let idle_timeout = hub.settings.idle_timeout;

    let reason = loop {
        let next = tokio::select! {
            _ = conn.cancelled() => break "close requested",
            next = next_inbound(&mut stream, idle_timeout) => next,
        };
        let msg = match next {
            Some(Some(Ok(msg))) => msg,
            Some(Some(Err(e))) => {
                debug!(connection_id = %conn.id(), err = %e, "read failed");
                break "read failed";
            }
            Some(None) => break "client disconnected",
            None => break "idle timeout",
        };

        match msg {
            Message::Text(text) => match parse_frame(text.as_str()) {
                Ok(frame) => handle_frame(&hub, &conn, frame).await,
                Err(e) if e.is_fatal() => {
                    debug!(connection_id = %conn.id(), err = %e, "closing on malformed frame");
                    break "malformed frame";
                }
                Err(e) => debug!(connection_id = %conn.id(), err = %e, "dropping frame"),
            },
            Message::Binary(_) => break "binary frame",
            Message::Close(_) => break "client closed",
            Message::Ping(_) | Message::Pong(_) => {}
        }
    };

    debug!(connection_id = %conn.id(), reason, "read loop ended");
    conn.request_close();
    teardown(&conn, &hub).await;
}

/// Next inbound item, or `None` when nothing arrived within `idle`.
async fn next_inbound<R>(stream: &mut R, idle: Option<Duration>) -> Option<Option<R::Item>>
where
    R: Stream + Unpin,
{
    match idle {
        Some(idle) => tokio::time::timeout(idle, stream.next()).await.ok(),
        None => Some(stream.next().await),
    }
}

/// Turn a client frame into an event for its destination. A frame a user
/// addresses to themselves skips the tab it came from.
///
/// Chat frames are relayed only between the two members of the
/// conversation they name.
async fn handle_frame(hub: &LiveHub, conn: &Connection, frame: ClientFrame) {
    let from = conn.user_id();
    let (to, event) = match frame {
        ClientFrame::ChatForward { to, mut message } => {
            match hub.chats().other_party(from, message.chat_id).await {
                Ok(Some(peer)) if peer == to => {}
                Ok(_) => {
                    debug!(
                        connection_id = %conn.id(),
                        chat_id = message.chat_id,
                        to = %to,
                        "dropping chat frame outside a shared conversation"
                    );
                    return;
                }
                Err(e) => {
                    warn!(connection_id = %conn.id(), err = %e, "chat membership lookup failed");
                    return;
                }
            }
            message.sender_id = from;
            message.is_own = false;
            (to, Event::ChatMessage(message))
        }
        ClientFrame::NotificationForward { to, payload } => {
            (to, Event::NotificationPing(NotificationPing { from, data: payload }))
        }
        ClientFrame::MarkAllReadForward { to } => {
            (to, Event::NotificationMarkedRead(NotificationMarkedRead { id: None }))
        }
        ClientFrame::ChatSeen { to, chat_id } => (
            to,
            Event::ReadReceipt(ReadReceipt {
                chat_id,
                reader_id: from,
                message: None,
                timestamp: epoch_ms(),
            }),
        ),
        ClientFrame::Unknown(channel) => {
            debug!(connection_id = %conn.id(), channel = %channel, "ignoring unknown channel");
            return;
        }
    };

    let exclude = (to == from).then(|| conn.session_id());
    let reached = hub.dispatch(to, event, exclude);
    debug!(user_id = %from, to = %to, reached, "forwarded client frame");
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
