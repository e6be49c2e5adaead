//! Push connection manager.
//!
//! Handles connection lifecycle, automatic reconnection with exponential
//! backoff, Socket.IO namespace handshake and `new_signal` forwarding.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{parse_frame, Frame, Framing, ENGINE_PONG, NAMESPACE_CONNECT};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sigdash_core::{PushEvent, PushStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL. For Socket.IO servers this is the Engine.IO endpoint,
    /// e.g. `ws://host:5000/socket.io/?EIO=4&transport=websocket`.
    pub url: String,
    /// Wire framing.
    #[serde(default)]
    pub framing: Framing,
    /// Event name carrying signals.
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for exponential backoff.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Heartbeat interval (overridden by the Socket.IO open packet).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Heartbeat grace period on top of the interval.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_event_name() -> String {
    "new_signal".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60000
}

fn default_heartbeat_interval_ms() -> u64 {
    25000
}

fn default_heartbeat_timeout_ms() -> u64 {
    20000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            framing: Framing::default(),
            event_name: default_event_name(),
            max_reconnect_attempts: 0, // Infinite
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

/// Push connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    state: Arc<RwLock<PushStatus>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<PushEvent>,
    reconnect_count: Arc<RwLock<u32>>,
    /// Cancellation token for graceful shutdown.
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new(config: ConnectionConfig, event_tx: mpsc::Sender<PushEvent>) -> Self {
        Self::with_shutdown(config, event_tx, CancellationToken::new())
    }

    /// Create a connection manager bound to an existing session token.
    pub fn with_shutdown(
        config: ConnectionConfig,
        event_tx: mpsc::Sender<PushEvent>,
        shutdown_token: CancellationToken,
    ) -> Self {
        let heartbeat = Arc::new(HeartbeatManager::new(
            config.heartbeat_interval_ms,
            config.heartbeat_timeout_ms,
        ));
        Self {
            config,
            state: Arc::new(RwLock::new(PushStatus::Disconnected)),
            heartbeat,
            event_tx,
            reconnect_count: Arc::new(RwLock::new(0)),
            shutdown_token,
        }
    }

    /// Get current connection state.
    pub fn state(&self) -> PushStatus {
        *self.state.read()
    }

    /// Consecutive failed attempts since the last successful connection.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    pub fn shutdown(&self) {
        info!("Push connection shutdown requested");
        self.shutdown_token.cancel();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run the message loop until shutdown.
    ///
    /// Returns `Err` only when `max_reconnect_attempts` is exhausted.
    pub async fn connect(&self) -> WsResult<()> {
        let result = self.connect_with_retry().await;
        self.set_state(PushStatus::Disconnected).await;
        result
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                return Ok(());
            }

            self.set_state(PushStatus::Connecting).await;

            match self.try_connect().await {
                Ok(()) => {
                    info!("Push connection closed");
                }
                Err(WsError::ReceiverDropped) => {
                    info!("Event receiver dropped, stopping push connection");
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "Push connection error");
                }
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                return Ok(());
            }

            let attempt = self.reconnect_count().saturating_add(1);
            *self.reconnect_count.write() = attempt;

            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            self.set_state(PushStatus::Reconnecting).await;

            let delay = self.calculate_backoff_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis(), "Reconnecting push channel");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, framing = ?self.config.framing, "Connecting push channel");

        let (ws_stream, _response) =
            connect_async_tls_with_config(&self.config.url, None, true, None).await?;
        let (mut write, mut read) = ws_stream.split();

        *self.reconnect_count.write() = 0;
        self.heartbeat.reset();

        // Socket.IO is only usable once the namespace handshake completes.
        if self.config.framing == Framing::Json {
            self.set_state(PushStatus::Connected).await;
        }
        info!("Push WebSocket connected");

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in push loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text, &mut write).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_message();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.heartbeat.record_pong();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Push channel closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Push channel read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Push stream ended");
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                () = self.heartbeat.wait_for_check() => {
                    if self.heartbeat.is_timed_out() {
                        error!(
                            silent_ms = self.heartbeat.time_since_last_message_ms(),
                            "Push heartbeat timeout"
                        );
                        return Err(WsError::HeartbeatTimeout);
                    }

                    // Socket.IO servers drive the ping themselves.
                    if self.config.framing == Framing::Json && self.heartbeat.should_send_heartbeat() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_ping();
                        debug!("Sent heartbeat ping");
                    }
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str, write: &mut WsSink) -> WsResult<()> {
        self.heartbeat.record_message();

        let frame = match parse_frame(text, self.config.framing) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, frame = %truncate(text, 120), "Ignoring undecodable push frame");
                return Ok(());
            }
        };

        match frame {
            Frame::Open(open) => {
                debug!(sid = %open.sid, "Engine.IO open received, joining namespace");
                self.heartbeat
                    .configure(open.ping_interval_ms, open.ping_timeout_ms);
                write.send(Message::Text(NAMESPACE_CONNECT.to_string())).await?;
            }
            Frame::Ping => {
                write.send(Message::Text(ENGINE_PONG.to_string())).await?;
            }
            Frame::Pong => {
                self.heartbeat.record_pong();
            }
            Frame::NamespaceConnected => {
                info!("Socket.IO namespace joined");
                self.set_state(PushStatus::Connected).await;
            }
            Frame::NamespaceDisconnected | Frame::Close => {
                return Err(WsError::ConnectionClosed {
                    code: 1000,
                    reason: "Server closed the session".to_string(),
                });
            }
            Frame::ConnectError(message) => {
                return Err(WsError::SubscriptionError(message));
            }
            Frame::Event { name, payload } => {
                if name == self.config.event_name {
                    self.forward(PushEvent::Signal(payload)).await?;
                } else {
                    debug!(event = %name, "Ignoring push event");
                }
            }
            Frame::Ignored => {}
        }

        Ok(())
    }

    async fn forward(&self, event: PushEvent) -> WsResult<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| WsError::ReceiverDropped)
    }

    async fn set_state(&self, status: PushStatus) {
        let previous = std::mem::replace(&mut *self.state.write(), status);
        if previous != status {
            debug!(from = %previous, to = %status, "Push status changed");
            if self.event_tx.send(PushEvent::Status(status)).await.is_err() {
                debug!("Status receiver dropped");
            }
        }
    }

    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.reconnect_base_delay_ms;
        let max = self.config.reconnect_max_delay_ms;

        // base * 2^(attempt-1), capped
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = base.saturating_mul(1u64 << exponent);
        let delay = delay.min(max);

        let jitter = rand_jitter(base.min(1000));
        Duration::from_millis(delay + jitter)
    }
}

/// Generate random jitter in `0..bound` ms.
fn rand_jitter(bound: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % bound
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
