//! Push transport lifecycle integration tests.
//!
//! Tests the connection lifecycle against a mock server:
//! - Socket.IO handshake and namespace join
//! - Event forwarding and filtering
//! - Server ping handling
//! - Reconnection behavior

mod integration;
use integration::common::mock_push::MockPushServer;

use serde_json::json;
use sigdash_core::{PushEvent, PushStatus};
use sigdash_ws::{ConnectionConfig, ConnectionManager, Framing};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn manager_for(
    url: String,
    framing: Framing,
) -> (Arc<ConnectionManager>, mpsc::Receiver<PushEvent>) {
    let config = ConnectionConfig {
        url,
        framing,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 50,
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<PushEvent>(100);
    (Arc::new(ConnectionManager::new(config, tx)), rx)
}

async fn next_signal(rx: &mut mpsc::Receiver<PushEvent>) -> serde_json::Value {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(PushEvent::Signal(payload)) => return payload,
                Some(PushEvent::Status(_)) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("no signal within timeout")
}

async fn wait_for_status(rx: &mut mpsc::Receiver<PushEvent>, wanted: PushStatus) {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Some(PushEvent::Status(status)) if status == wanted => return,
                Some(_) => continue,
                None => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("status not reached within timeout")
}

/// Socket.IO: open packet, namespace join, then `new_signal` forwarding.
#[tokio::test]
async fn test_socketio_handshake_and_forwarding() {
    let server = MockPushServer::start(Framing::SocketIo).await;
    let (manager, mut rx) = manager_for(server.url(), Framing::SocketIo);

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    wait_for_status(&mut rx, PushStatus::Connected).await;
    assert_eq!(manager.state(), PushStatus::Connected);
    assert!(server.received_messages().await.contains(&"40".to_string()));

    server.emit("symbols_update", json!(["BTC"]));
    server.emit(
        "new_signal",
        json!({"symbol": "BTC", "signal": "UP", "time": "10:00", "timeframe": "1H"}),
    );

    // The unrelated event is dropped; the first forwarded payload is the signal.
    let payload = next_signal(&mut rx).await;
    assert_eq!(payload["symbol"], "BTC");
    assert_eq!(payload["signal"], "UP");

    manager.shutdown();
    timeout(Duration::from_secs(2), handle)
        .await
        .expect("connection task did not stop")
        .unwrap();
    assert_eq!(manager.state(), PushStatus::Disconnected);
    server.shutdown().await;
}

/// Server ping `2` is answered with pong `3`.
#[tokio::test]
async fn test_replies_pong_to_server_ping() {
    let server = MockPushServer::start(Framing::SocketIo).await;
    let (manager, mut rx) = manager_for(server.url(), Framing::SocketIo);

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    wait_for_status(&mut rx, PushStatus::Connected).await;
    server.send_raw("2");

    let ponged = timeout(Duration::from_secs(2), async {
        loop {
            if server.received_messages().await.iter().any(|m| m == "3") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(ponged.is_ok(), "client should answer ping with pong");

    handle.abort();
    server.shutdown().await;
}

/// Namespace disconnect triggers a reconnect.
#[tokio::test]
async fn test_reconnects_after_namespace_disconnect() {
    let server = MockPushServer::start(Framing::SocketIo).await;
    let (manager, mut rx) = manager_for(server.url(), Framing::SocketIo);

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    wait_for_status(&mut rx, PushStatus::Connected).await;
    server.send_raw("41");

    wait_for_status(&mut rx, PushStatus::Reconnecting).await;
    wait_for_status(&mut rx, PushStatus::Connected).await;
    assert!(server.connection_count().await >= 2);

    handle.abort();
    server.shutdown().await;
}

/// Plain JSON framing connects without a namespace handshake.
#[tokio::test]
async fn test_json_framing() {
    let server = MockPushServer::start(Framing::Json).await;
    let (manager, mut rx) = manager_for(server.url(), Framing::Json);

    let manager_clone = manager.clone();
    let handle = tokio::spawn(async move {
        let _ = manager_clone.connect().await;
    });

    wait_for_status(&mut rx, PushStatus::Connected).await;
    server.emit("new_signal", json!({"symbol": "ETH", "direction": "down", "time": 1714557600}));

    let payload = next_signal(&mut rx).await;
    assert_eq!(payload["symbol"], "ETH");
    assert!(server.received_messages().await.is_empty());

    handle.abort();
    server.shutdown().await;
}

/// Connection respects max reconnect attempts.
#[tokio::test]
async fn test_respects_max_reconnect_attempts() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ConnectionConfig {
        url: format!("ws://{addr}"),
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 20,
        ..Default::default()
    };
    let (tx, _rx) = mpsc::channel::<PushEvent>(100);
    let manager = ConnectionManager::new(config, tx);

    let result = timeout(Duration::from_secs(5), manager.connect())
        .await
        .expect("connect should give up within timeout");
    assert!(result.is_err());
    assert_eq!(manager.reconnect_count(), 2);
    assert_eq!(manager.state(), PushStatus::Disconnected);
}
