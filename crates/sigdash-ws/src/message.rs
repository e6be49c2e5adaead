//! Push frame decoding.
//!
//! Socket.IO over WebSocket (Engine.IO v4) text frames start with a packet
//! type digit:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 1                                                         close
//! 2 / 3                                                     ping / pong
//! 40{"sid":".."}                                            namespace connected
//! 41                                                        namespace disconnected
//! 42["new_signal",{...}]                                    event
//! 44{"message":".."}                                        connect error
//! ```
//!
//! Plain JSON framing sends `{"event":"new_signal","data":{...}}` per frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WsError, WsResult};

/// Wire framing used by the push server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Socket.IO v5 / Engine.IO v4 text packets.
    #[default]
    SocketIo,
    /// One JSON object per frame.
    Json,
}

/// Engine.IO handshake payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineOpen {
    #[serde(default)]
    pub sid: String,
    #[serde(rename = "pingInterval")]
    pub ping_interval_ms: u64,
    #[serde(rename = "pingTimeout")]
    pub ping_timeout_ms: u64,
}

/// Decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(EngineOpen),
    Close,
    Ping,
    Pong,
    NamespaceConnected,
    NamespaceDisconnected,
    ConnectError(String),
    Event { name: String, payload: Value },
    /// Valid but irrelevant frame (acks, binary placeholders, upgrades).
    Ignored,
}

/// Client reply that joins the default namespace.
pub const NAMESPACE_CONNECT: &str = "40";

/// Client reply to an Engine.IO ping.
pub const ENGINE_PONG: &str = "3";

/// JSON envelope for plain framing.
#[derive(Debug, Deserialize)]
struct JsonEnvelope {
    event: String,
    #[serde(default, alias = "payload")]
    data: Value,
}

/// Decode one text frame.
pub fn parse_frame(text: &str, framing: Framing) -> WsResult<Frame> {
    match framing {
        Framing::SocketIo => parse_socket_io(text),
        Framing::Json => parse_json(text),
    }
}

fn parse_json(text: &str) -> WsResult<Frame> {
    let envelope: JsonEnvelope = serde_json::from_str(text)?;
    Ok(Frame::Event {
        name: envelope.event,
        payload: envelope.data,
    })
}

fn parse_socket_io(text: &str) -> WsResult<Frame> {
    let mut chars = text.chars();
    let engine_type = chars
        .next()
        .ok_or_else(|| WsError::ParseError("empty frame".to_string()))?;
    let rest = chars.as_str();

    match engine_type {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_socket_io_packet(rest),
        '5' | '6' => Ok(Frame::Ignored),
        other => Err(WsError::ParseError(format!(
            "unknown engine packet type {other:?}"
        ))),
    }
}

fn parse_socket_io_packet(packet: &str) -> WsResult<Frame> {
    let mut chars = packet.chars();
    let packet_type = chars
        .next()
        .ok_or_else(|| WsError::ParseError("empty socket.io packet".to_string()))?;
    let body = strip_namespace_and_ack(chars.as_str());

    match packet_type {
        '0' => Ok(Frame::NamespaceConnected),
        '1' => Ok(Frame::NamespaceDisconnected),
        '2' => parse_event(body),
        '4' => {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| body.to_string());
            Ok(Frame::ConnectError(message))
        }
        // ack / binary event / binary ack
        '3' | '5' | '6' => Ok(Frame::Ignored),
        other => Err(WsError::ParseError(format!(
            "unknown socket.io packet type {other:?}"
        ))),
    }
}

/// Drop an optional `/namespace,` prefix and numeric ack id.
fn strip_namespace_and_ack(body: &str) -> &str {
    let body = if body.starts_with('/') {
        body.split_once(',').map(|(_, rest)| rest).unwrap_or("")
    } else {
        body
    };
    body.trim_start_matches(|c: char| c.is_ascii_digit())
}

fn parse_event(body: &str) -> WsResult<Frame> {
    let items: Vec<Value> = serde_json::from_str(body)?;
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        other => {
            return Err(WsError::ParseError(format!(
                "event name must be a string, got {other:?}"
            )))
        }
    };
    Ok(Frame::Event {
        name,
        payload: items.next().unwrap_or(Value::Null),
    })
}
