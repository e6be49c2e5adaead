//! Messages delivered by the push transport to the sync loop.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Push subscription status as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Event forwarded from the push transport.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A `new_signal` payload, not yet normalized.
    Signal(Value),
    /// Transport status change.
    Status(PushStatus),
}
