//! Push subscription transport for sigdash.
//!
//! Provides the `new_signal` event stream with:
//! - Socket.IO (Engine.IO v4) or plain JSON framing over WebSocket
//! - Automatic reconnection with exponential backoff
//! - Heartbeat monitoring (server ping or client ping, silence timeout)
//! - Status reporting through `PushEvent::Status`
//!
//! Reconnection is owned here; consumers only see a stream of
//! `PushEvent`s and must tolerate re-delivered events after a reconnect.

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{ConnectionConfig, ConnectionManager};
pub use error::{WsError, WsResult};
pub use heartbeat::HeartbeatManager;
pub use message::{parse_frame, EngineOpen, Frame, Framing};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
