//! End-to-end tests for mirror-client.
//!
//! Each test stands up a real WebSocket server for the push channel and an
//! in-memory REST transport, then drives a domain store through fetch,
//! mutation, push, and reconnect flows.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use mirror_client::{ChannelConfig, ClassroomStore, InMemoryRest, ItemListStore, RestError};
use mirror_core::{ConnectionState, StoreEvent};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

/// A push-channel server handing accepted connections to the test.
struct PushServer {
    addr: SocketAddr,
    accepted: mpsc::UnboundedReceiver<WebSocketStream<TcpStream>>,
}

impl PushServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, accepted) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                if tx.send(ws).is_err() {
                    break;
                }
            }
        });

        Self { addr, accepted }
    }

    fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    async fn next_connection(&mut self) -> WebSocketStream<TcpStream> {
        timeout(Duration::from_secs(2), self.accepted.recv())
            .await
            .expect("timed out waiting for a push-channel connection")
            .expect("server stopped")
    }
}

async fn push_text(ws: &mut WebSocketStream<TcpStream>, text: &str) {
    ws.send(Message::Text(text.into())).await.unwrap();
}

/// Forward store events into an awaitable channel.
fn watch_store<S: Clone + Default + Send + Sync + 'static>(
    store: &mirror_core::Store<S>,
) -> (
    mirror_core::Subscription<StoreEvent>,
    mpsc::UnboundedReceiver<StoreEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sub = store.subscribe(move |event| {
        let _ = tx.send(event);
    });
    (sub, rx)
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<StoreEvent>,
    want: impl Fn(&StoreEvent) -> bool,
) {
    loop {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for store event")
            .expect("store event stream ended");
        if want(&event) {
            return;
        }
    }
}

#[tokio::test]
async fn test_classroom_initial_fetch_then_push_replacement() {
    let mut server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());
    transport.set_response(
        "/data",
        json!({
            "classes": [{"id": "c1", "alias": "A"}],
            "courses": []
        }),
    );

    let mut classroom = ClassroomStore::new(Arc::clone(&transport), server.url());
    classroom.fetch_data().await;

    let store = classroom.store();
    assert_eq!(store.collections().classes[0].alias, "A");

    let (_sub, mut events) = watch_store(&store);
    classroom.connect();
    let mut ws = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    // Server broadcasts a new authoritative snapshot.
    push_text(
        &mut ws,
        r#"{"type":"data_updated","payload":{
            "classes": [{"id": "c1", "alias": "renamed"}, {"id": "c2", "alias": "B"}],
            "courses": [{"id": "k1", "subject": "math", "class_ids": ["c1", "c2"]}]
        }}"#,
    )
    .await;
    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;

    let snapshot = store.collections();
    assert_eq!(snapshot.classes.len(), 2);
    assert_eq!(snapshot.classes[0].alias, "renamed");
    assert_eq!(snapshot.courses[0].class_ids, vec!["c1", "c2"]);

    classroom.disconnect();
}

#[tokio::test]
async fn test_items_mutation_is_confirmed_only_by_push() {
    let mut server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());
    transport.set_response("/items", json!([{"id": "1", "title": "x", "completed": false}]));

    let mut items = ItemListStore::new(Arc::clone(&transport), server.url());
    items.fetch_items().await;
    let store = items.store();

    let (_sub, mut events) = watch_store(&store);
    items.connect();
    let mut ws = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    // A successful write acknowledges without changing local state.
    let item = store.collections()[0].clone();
    items.toggle_item(&item).await;
    assert!(!store.collections()[0].completed);
    assert_eq!(transport.requests().last().unwrap().path, "/items/1");

    // The window closes when the server echoes the new truth.
    push_text(
        &mut ws,
        r#"{"type":"items_updated","payload":[{"id":"1","title":"x","completed":true}]}"#,
    )
    .await;
    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;
    assert!(store.collections()[0].completed);

    items.disconnect();
}

#[tokio::test]
async fn test_failed_mutation_leaves_items_untouched() {
    let server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());
    transport.set_response("/items", json!([{"id": "5", "title": "y", "completed": false}]));

    let items = ItemListStore::new(Arc::clone(&transport), server.url());
    items.fetch_items().await;
    let store = items.store();

    transport.fail_with(RestError::Status("500 Internal Server Error".into()));
    let item = store.collections()[0].clone();
    items.toggle_item(&item).await;

    assert_eq!(
        store.error().as_deref(),
        Some("Failed to update item: 500 Internal Server Error")
    );
    let unchanged = store.collections();
    assert_eq!(unchanged.len(), 1);
    assert!(!unchanged[0].completed);
}

#[tokio::test]
async fn test_malformed_push_changes_nothing() {
    let mut server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());
    transport.set_response("/items", json!([{"id": "1", "title": "x", "completed": false}]));

    let mut items = ItemListStore::new(Arc::clone(&transport), server.url());
    items.fetch_items().await;
    let store = items.store();

    let (_sub, mut events) = watch_store(&store);
    items.connect();
    let mut ws = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    push_text(&mut ws, "{{{{ definitely not json").await;
    push_text(&mut ws, r#"{"payload": [1, 2, 3]}"#).await;
    push_text(&mut ws, r#"{"type": "someday_maybe", "payload": null}"#).await;

    // Follow with a valid frame to prove the channel survived all three.
    push_text(
        &mut ws,
        r#"{"type":"items_updated","payload":[{"id":"2","title":"z","completed":false}]}"#,
    )
    .await;
    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;

    let item_list = store.collections();
    assert_eq!(item_list.len(), 1);
    assert_eq!(item_list[0].id, "2");
    assert_eq!(store.connection(), ConnectionState::Connected);
    assert!(store.error().is_none());

    items.disconnect();
}

#[tokio::test]
async fn test_store_reconnects_and_resumes_receiving_pushes() {
    let mut server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());

    let mut items = ItemListStore::with_config(
        Arc::clone(&transport),
        server.url(),
        ChannelConfig {
            reconnect_delay: Duration::from_millis(150),
        },
    );
    let store = items.store();
    let (_sub, mut events) = watch_store(&store);

    items.connect();
    let ws = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    // Unexpected close: the store observes the drop, then the recovery.
    drop(ws);
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Disconnected)
    })
    .await;

    let mut ws2 = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    // Pushes on the new connection land as usual.
    push_text(
        &mut ws2,
        r#"{"type":"items_updated","payload":[{"id":"9","title":"after","completed":false}]}"#,
    )
    .await;
    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;
    assert_eq!(store.collections()[0].id, "9");

    items.disconnect();
}

#[tokio::test]
async fn test_out_of_order_push_silently_wins() {
    let mut server = PushServer::start().await;
    let transport = Arc::new(InMemoryRest::new());

    let mut items = ItemListStore::new(Arc::clone(&transport), server.url());
    let store = items.store();
    let (_sub, mut events) = watch_store(&store);

    items.connect();
    let mut ws = server.next_connection().await;
    wait_for(&mut events, |e| {
        *e == StoreEvent::ConnectionChanged(ConnectionState::Connected)
    })
    .await;

    // No staleness detection: each arrival replaces the last, full stop.
    push_text(
        &mut ws,
        r#"{"type":"items_updated","payload":[{"id":"1","title":"newer","completed":true}]}"#,
    )
    .await;
    push_text(
        &mut ws,
        r#"{"type":"items_updated","payload":[{"id":"1","title":"older","completed":false}]}"#,
    )
    .await;

    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;
    wait_for(&mut events, |e| *e == StoreEvent::SnapshotReplaced).await;
    assert_eq!(store.collections()[0].title, "older");

    items.disconnect();
}
