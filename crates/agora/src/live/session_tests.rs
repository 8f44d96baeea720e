// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, PollSender};

use super::*;
use crate::live::LiveSettings;
use crate::model::{Contact, SessionId, UserId};
use crate::store::{MemoryStore, RelationshipStore, StoreFuture, Stores};

const WAIT: Duration = Duration::from_secs(2);

/// Test side of one connection: frames the server wrote, a handle to feed
/// client frames, and the session task.
struct Client {
    conn: Arc<Connection>,
    outbound: mpsc::Receiver<Message>,
    inbound: mpsc::Sender<Result<Message, String>>,
    task: JoinHandle<()>,
}

impl Client {
    async fn send_text(&self, text: &str) -> anyhow::Result<()> {
        self.inbound
            .send(Ok(Message::Text(text.to_owned().into())))
            .await
            .map_err(|_| anyhow::anyhow!("session stopped reading"))
    }

    /// Next text frame written by the server, decoded as JSON.
    async fn recv_json(&mut self) -> anyhow::Result<Value> {
        loop {
            let msg = tokio::time::timeout(WAIT, self.outbound.recv())
                .await?
                .ok_or_else(|| anyhow::anyhow!("outbound closed"))?;
            if let Message::Text(text) = msg {
                return Ok(serde_json::from_str(text.as_str())?);
            }
        }
    }

    async fn finished(self) -> anyhow::Result<Arc<Connection>> {
        tokio::time::timeout(WAIT, self.task).await??;
        Ok(self.conn)
    }
}

/// 1 follows 2; they share chat 10. User 3 shares no chat with anyone.
fn stores() -> Stores {
    let store = MemoryStore::new();
    store.add_chat(10, UserId(1), UserId(2));
    store.follow(UserId(1), UserId(2));
    Stores::memory(Arc::new(store))
}

fn hub_with(settings: LiveSettings) -> Arc<LiveHub> {
    Arc::new(LiveHub::new(&stores(), settings))
}

fn hub() -> Arc<LiveHub> {
    hub_with(LiveSettings { queue_capacity: 16, ping_interval: None, idle_timeout: None })
}

/// Open a connection and start its session without waiting for it.
fn start(hub: &Arc<LiveHub>, user: i64, session: &str) -> Client {
    let (out_tx, outbound) = mpsc::channel(64);
    let (inbound, in_rx) = mpsc::channel(64);
    let conn = hub.open(UserId(user), SessionId::new(session));
    let task = tokio::spawn(run(
        Arc::clone(hub),
        Arc::clone(&conn),
        PollSender::new(out_tx),
        ReceiverStream::new(in_rx),
    ));
    Client { conn, outbound, inbound, task }
}

async fn attach(hub: &Arc<LiveHub>, user: i64, session: &str) -> anyhow::Result<Client> {
    let client = start(hub, user, session);
    let deadline = tokio::time::Instant::now() + WAIT;
    while client.conn.state() != ConnState::Active {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("connection never became active");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(client)
}

#[tokio::test]
async fn writer_encodes_dispatched_events() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;

    hub.dispatch(UserId(2), Event::NotificationMarkedRead(NotificationMarkedRead { id: Some(3) }), None);

    let frame = bob.recv_json().await?;
    assert_eq!(frame, json!({"channel": "notifications-read", "to": 2, "payload": {"id": 3}}));
    Ok(())
}

#[tokio::test]
async fn peer_sees_online_status_frame() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let _ada = attach(&hub, 1, "a").await?;

    let frame = bob.recv_json().await?;
    assert_eq!(frame["channel"], "status");
    assert_eq!(frame["payload"], json!({"user": 10, "peer_id": 1, "status": true}));
    Ok(())
}

#[tokio::test]
async fn chat_frame_is_forwarded_with_sender() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let ada = attach(&hub, 1, "a").await?;
    bob.recv_json().await?; // ada's status

    ada.send_text(
        r#"{"channel":"chat","to":"2","payload":{"id":"m1","chat_id":10,"sender_id":99,"content":"hi"}}"#,
    )
    .await?;

    let frame = bob.recv_json().await?;
    assert_eq!(frame["channel"], "chat");
    assert_eq!(frame["to"], 2);
    assert_eq!(frame["payload"]["sender_id"], 1);
    assert_eq!(frame["payload"]["content"], "hi");
    assert_eq!(frame["payload"]["is_own"], false);
    Ok(())
}

#[tokio::test]
async fn chat_seen_becomes_read_receipt() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let ada = attach(&hub, 1, "a").await?;
    bob.recv_json().await?;

    ada.send_text(r#"{"channel":"chat-seen","to":2,"chat_id":10}"#).await?;

    let frame = bob.recv_json().await?;
    assert_eq!(frame["channel"], "chat-seen");
    assert_eq!(frame["payload"]["chat_id"], 10);
    assert_eq!(frame["payload"]["reader_id"], 1);
    Ok(())
}

#[tokio::test]
async fn unknown_and_invalid_frames_are_skipped() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let ada = attach(&hub, 1, "a").await?;
    bob.recv_json().await?;

    ada.send_text(r#"{"channel":"typing","to":2}"#).await?;
    ada.send_text(r#"{"channel":"notification"}"#).await?;
    ada.send_text(r#"{"channel":"notification","to":2,"payload":{"kind":"like"}}"#).await?;

    let frame = bob.recv_json().await?;
    assert_eq!(frame["channel"], "notifications");
    assert_eq!(frame["payload"], json!({"from": 1, "data": {"kind": "like"}}));
    assert!(hub.is_online(UserId(1)));
    Ok(())
}

#[tokio::test]
async fn self_addressed_frame_skips_origin_tab() -> anyhow::Result<()> {
    let hub = hub();
    let tab_a = attach(&hub, 1, "a").await?;
    let mut tab_b = attach(&hub, 1, "b").await?;

    tab_a.send_text(r#"{"channel":"notifications-read","to":1}"#).await?;

    let frame = tab_b.recv_json().await?;
    assert_eq!(frame["channel"], "notifications-read");
    assert_eq!(frame["payload"], json!({"id": null}));

    let mut tab_a = tab_a;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(tab_a.outbound.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn malformed_frame_ends_session() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let ada = attach(&hub, 1, "a").await?;
    bob.recv_json().await?;

    ada.send_text("{not json").await?;

    let conn = ada.finished().await?;
    assert_eq!(conn.state(), ConnState::Closed);
    assert!(!hub.is_online(UserId(1)));

    let frame = bob.recv_json().await?;
    assert_eq!(frame["payload"], json!({"user": 10, "peer_id": 1, "status": false}));
    Ok(())
}

#[tokio::test]
async fn client_close_closes_sink() -> anyhow::Result<()> {
    let hub = hub();
    let mut ada = attach(&hub, 1, "a").await?;

    ada.inbound.send(Ok(Message::Close(None))).await?;

    let closed = tokio::time::timeout(WAIT, ada.outbound.recv()).await?;
    assert!(closed.is_none());
    ada.finished().await?;
    assert_eq!(hub.registry.connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn read_error_ends_session() -> anyhow::Result<()> {
    let hub = hub();
    let ada = attach(&hub, 1, "a").await?;
    ada.inbound.send(Err("connection reset".to_owned())).await?;
    ada.finished().await?;
    assert!(!hub.is_online(UserId(1)));
    Ok(())
}

#[tokio::test]
async fn close_request_ends_both_loops() -> anyhow::Result<()> {
    let hub = hub();
    let ada = attach(&hub, 1, "a").await?;
    let other = attach(&hub, 1, "other").await?;

    assert_eq!(hub.close_session(&SessionId::new("a")), 1);

    let conn = ada.finished().await?;
    assert_eq!(conn.state(), ConnState::Closed);
    assert_eq!(other.conn.state(), ConnState::Active);
    assert!(hub.is_online(UserId(1)));
    Ok(())
}

#[tokio::test]
async fn idle_connection_times_out() -> anyhow::Result<()> {
    let hub = hub_with(LiveSettings {
        queue_capacity: 16,
        ping_interval: None,
        idle_timeout: Some(Duration::from_millis(50)),
    });
    let ada = attach(&hub, 1, "a").await?;
    ada.finished().await?;
    assert!(!hub.is_online(UserId(1)));
    Ok(())
}

#[tokio::test]
async fn pings_are_sent_on_interval() -> anyhow::Result<()> {
    let hub = hub_with(LiveSettings {
        queue_capacity: 16,
        ping_interval: Some(Duration::from_millis(20)),
        idle_timeout: None,
    });
    let mut ada = attach(&hub, 1, "a").await?;

    let msg = tokio::time::timeout(WAIT, ada.outbound.recv()).await?;
    assert!(matches!(msg, Some(Message::Ping(_))));
    Ok(())
}

#[tokio::test]
async fn teardown_runs_once() -> anyhow::Result<()> {
    let hub = hub();
    let observer = hub.open(UserId(2), SessionId::new("b"));
    hub.presence.connect(Arc::clone(&observer)).await;
    let conn = hub.open(UserId(1), SessionId::new("a"));
    hub.presence.connect(Arc::clone(&conn)).await;
    while observer.queue().try_pop().is_some() {}

    let (first, second) = tokio::join!(teardown(&conn, &hub), teardown(&conn, &hub));
    assert!(first ^ second);
    assert!(!teardown(&conn, &hub).await);

    assert_eq!(conn.state(), ConnState::Closed);
    assert!(conn.queue().is_closed());
    assert!(!hub.is_online(UserId(1)));
    let offline: Vec<_> = std::iter::from_fn(|| observer.queue().try_pop()).collect();
    assert_eq!(offline.len(), 1);
    Ok(())
}

#[tokio::test]
async fn chat_frame_outside_shared_chat_is_dropped() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;
    let cy = attach(&hub, 3, "c").await?;

    // Cy is not in chat 10, and chat 99 does not exist.
    cy.send_text(
        r#"{"channel":"chat","to":2,"payload":{"id":"x","chat_id":10,"sender_id":3,"content":"spoof"}}"#,
    )
    .await?;
    cy.send_text(
        r#"{"channel":"chat","to":2,"payload":{"id":"y","chat_id":99,"sender_id":3,"content":"spoof"}}"#,
    )
    .await?;
    cy.send_text(r#"{"channel":"notification","to":2,"payload":{}}"#).await?;

    let frame = bob.recv_json().await?;
    assert_eq!(frame["channel"], "notifications");
    Ok(())
}

#[tokio::test]
async fn chat_frame_to_wrong_member_is_dropped() -> anyhow::Result<()> {
    let hub = hub();
    let mut cy = attach(&hub, 3, "c").await?;
    let ada = attach(&hub, 1, "a").await?;

    ada.send_text(
        r#"{"channel":"chat","to":3,"payload":{"id":"x","chat_id":10,"sender_id":1,"content":"wrong"}}"#,
    )
    .await?;
    ada.send_text(r#"{"channel":"notification","to":3,"payload":{}}"#).await?;

    let frame = cy.recv_json().await?;
    assert_eq!(frame["channel"], "notifications");
    Ok(())
}

/// Contact lookups that park until released.
struct SlowContacts {
    entered: Notify,
    released: CancellationToken,
}

impl RelationshipStore for SlowContacts {
    fn contacts(&self, _user: UserId) -> StoreFuture<'_, Vec<Contact>> {
        Box::pin(async move {
            self.entered.notify_one();
            self.released.cancelled().await;
            Ok(vec![Contact { user_id: UserId(2), chat_id: Some(10) }])
        })
    }
}

#[tokio::test]
async fn logout_reaches_tabs_still_registering() -> anyhow::Result<()> {
    let slow = Arc::new(SlowContacts { entered: Notify::new(), released: CancellationToken::new() });
    let stores = Stores { relationships: Arc::clone(&slow) as Arc<dyn RelationshipStore>, ..stores() };
    let hub = Arc::new(LiveHub::new(&stores, LiveSettings {
        queue_capacity: 16,
        ping_interval: None,
        idle_timeout: None,
    }));

    // The first tab holds the user's presence gate inside the lookup; the
    // second waits behind it, not yet registered.
    let first = start(&hub, 1, "s");
    tokio::time::timeout(WAIT, slow.entered.notified()).await?;
    let second = start(&hub, 1, "s");

    assert_eq!(hub.close_session(&SessionId::new("s")), 2);
    slow.released.cancel();

    let first = first.finished().await?;
    let second = second.finished().await?;
    assert_eq!(first.state(), ConnState::Closed);
    assert_eq!(second.state(), ConnState::Closed);
    assert!(!hub.is_online(UserId(1)));
    assert_eq!(hub.registry.connection_count(), 0);
    Ok(())
}

#[tokio::test]
async fn close_before_registration_never_registers() -> anyhow::Result<()> {
    let hub = hub();
    let mut bob = attach(&hub, 2, "b").await?;

    let conn = hub.open(UserId(1), SessionId::new("a"));
    assert_eq!(hub.close_session(&SessionId::new("a")), 1);

    let (out_tx, _outbound) = mpsc::channel(4);
    let (_inbound, in_rx) = mpsc::channel::<Result<Message, String>>(4);
    tokio::time::timeout(
        WAIT,
        run(Arc::clone(&hub), Arc::clone(&conn), PollSender::new(out_tx), ReceiverStream::new(in_rx)),
    )
    .await?;

    assert_eq!(conn.state(), ConnState::Closed);
    assert!(!hub.is_online(UserId(1)));
    assert_eq!(hub.close_session(&SessionId::new("a")), 0);
    hub.dispatch(UserId(2), Event::NotificationMarkedRead(NotificationMarkedRead { id: None }), None);
    assert_eq!(bob.recv_json().await?["channel"], "notifications-read");
    Ok(())
}
