//! Mock push server for integration tests.
//!
//! Speaks either Engine.IO v4 / Socket.IO text packets or plain JSON
//! frames, records everything the client sends, and lets the test emit
//! events to every connected client.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sigdash_ws::Framing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

const OPEN_PACKET: &str =
    r#"0{"sid":"mock-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// A mock push server.
pub struct MockPushServer {
    addr: SocketAddr,
    framing: Framing,
    shutdown_tx: mpsc::Sender<()>,
    outbound: broadcast::Sender<String>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
}

impl MockPushServer {
    /// Start a new mock server on an available port.
    pub async fn start(framing: Framing) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let connections: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let (outbound, _) = broadcast::channel::<String>(64);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let received_clone = received.clone();
        let connections_clone = connections.clone();
        let outbound_clone = outbound.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(
                            stream,
                            framing,
                            outbound_clone.subscribe(),
                            received_clone.clone(),
                            connections_clone.clone(),
                        ));
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            framing,
            shutdown_tx,
            outbound,
            received,
            connections,
        }
    }

    /// WebSocket URL clients should connect to.
    pub fn url(&self) -> String {
        match self.framing {
            Framing::SocketIo => format!("ws://{}/socket.io/?EIO=4&transport=websocket", self.addr),
            Framing::Json => format!("ws://{}", self.addr),
        }
    }

    /// Emit an event to every connected client.
    pub fn emit(&self, event: &str, payload: Value) {
        let frame = match self.framing {
            Framing::SocketIo => format!("42{}", json!([event, payload])),
            Framing::Json => json!({"event": event, "data": payload}).to_string(),
        };
        self.send_raw(frame);
    }

    /// Send a raw text frame to every connected client.
    pub fn send_raw(&self, frame: impl Into<String>) {
        // No receivers simply means no client is connected yet.
        let _ = self.outbound.send(frame.into());
    }

    pub async fn connection_count(&self) -> u32 {
        *self.connections.lock().await
    }

    /// Text frames received from clients.
    pub async fn received_messages(&self) -> Vec<String> {
        self.received.lock().await.clone()
    }

    /// Shutdown the accept loop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(
    stream: TcpStream,
    framing: Framing,
    mut outbound: broadcast::Receiver<String>,
    received: Arc<Mutex<Vec<String>>>,
    connections: Arc<Mutex<u32>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    {
        let mut count = connections.lock().await;
        *count += 1;
    }

    let (mut write, mut read) = ws_stream.split();

    if framing == Framing::SocketIo && write.send(Message::Text(OPEN_PACKET.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        received.lock().await.push(text.clone());
                        // Namespace join request
                        if framing == Framing::SocketIo && text == "40" {
                            let _ = write.send(Message::Text(r#"40{"sid":"mock-ns"}"#.to_string())).await;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            frame = outbound.recv() => {
                match frame {
                    Ok(frame) => {
                        if write.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockPushServer::start(Framing::SocketIo).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        assert!(server.url().ends_with("transport=websocket"));
        server.shutdown().await;
    }
}
