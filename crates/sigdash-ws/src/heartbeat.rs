//! Heartbeat management for the push connection.
//!
//! Socket.IO servers ping the client every `pingInterval` and expect the
//! client to notice a dead link after `pingInterval + pingTimeout` of
//! silence. With plain JSON framing the client sends WebSocket pings itself
//! and applies the same silence rule.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Heartbeat manager for push connection health.
pub struct HeartbeatManager {
    /// Expected ping cadence.
    interval_ms: AtomicU64,
    /// Grace period on top of the interval before the link is dead.
    timeout_ms: AtomicU64,
    /// Last ping sent time (client-initiated pings only).
    last_ping: RwLock<Option<DateTime<Utc>>>,
    /// Last message received time (any frame).
    last_message: RwLock<DateTime<Utc>>,
    /// Whether we're waiting for a pong to our own ping.
    waiting_for_pong: RwLock<bool>,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    pub fn new(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval_ms: AtomicU64::new(interval_ms),
            timeout_ms: AtomicU64::new(timeout_ms),
            last_ping: RwLock::new(None),
            last_message: RwLock::new(Utc::now()),
            waiting_for_pong: RwLock::new(false),
        }
    }

    /// Adopt the server-announced ping cadence (Engine.IO open packet).
    pub fn configure(&self, interval_ms: u64, timeout_ms: u64) {
        self.interval_ms.store(interval_ms, Ordering::Relaxed);
        self.timeout_ms.store(timeout_ms, Ordering::Relaxed);
        debug!(interval_ms, timeout_ms, "Heartbeat reconfigured by server");
    }

    /// Reset heartbeat state (called on connection).
    pub fn reset(&self) {
        *self.last_ping.write() = None;
        *self.last_message.write() = Utc::now();
        *self.waiting_for_pong.write() = false;
    }

    /// Record that a client ping was sent.
    pub fn record_ping(&self) {
        *self.last_ping.write() = Some(Utc::now());
        *self.waiting_for_pong.write() = true;
    }

    /// Record that a pong was received.
    pub fn record_pong(&self) {
        let now = Utc::now();
        *self.waiting_for_pong.write() = false;
        *self.last_message.write() = now;

        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (now - ping_time).num_milliseconds();
            debug!(rtt_ms, "Received pong");
        }
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.load(Ordering::Relaxed)
    }

    /// Get time since last frame.
    pub fn time_since_last_message_ms(&self) -> i64 {
        (Utc::now() - *self.last_message.read()).num_milliseconds()
    }

    /// Whether the link has been silent longer than interval + timeout.
    pub fn is_timed_out(&self) -> bool {
        let limit = self.interval_ms().saturating_add(self.timeout_ms());
        self.time_since_last_message_ms() > limit as i64
    }

    /// Check if a client ping should be sent.
    pub fn should_send_heartbeat(&self) -> bool {
        if *self.waiting_for_pong.read() {
            return false;
        }
        self.time_since_last_message_ms() >= self.interval_ms() as i64
    }

    /// Wait for the next heartbeat check.
    pub async fn wait_for_check(&self) {
        let period = (self.interval_ms() / 2).max(100);
        tokio::time::sleep(Duration::from_millis(period)).await;
    }
}

impl std::fmt::Debug for HeartbeatManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatManager")
            .field("interval_ms", &self.interval_ms())
            .field("timeout_ms", &self.timeout_ms())
            .field("waiting_for_pong", &*self.waiting_for_pong.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_initial_state() {
        let hb = HeartbeatManager::new(25000, 20000);
        assert!(!hb.is_timed_out());
        assert!(!hb.should_send_heartbeat());
    }

    #[test]
    fn test_heartbeat_ping_pong() {
        let hb = HeartbeatManager::new(0, 10000);

        assert!(hb.should_send_heartbeat());
        hb.record_ping();
        assert!(*hb.waiting_for_pong.read());
        assert!(!hb.should_send_heartbeat());

        hb.record_pong();
        assert!(!*hb.waiting_for_pong.read());
    }

    #[test]
    fn test_heartbeat_times_out_after_silence() {
        let hb = HeartbeatManager::new(0, 0);
        *hb.last_message.write() = Utc::now() - chrono::Duration::seconds(1);
        assert!(hb.is_timed_out());

        hb.record_message();
        hb.configure(25000, 20000);
        assert!(!hb.is_timed_out());
    }

    #[test]
    fn test_configure_from_server() {
        let hb = HeartbeatManager::new(45000, 10000);
        hb.configure(25000, 20000);
        assert_eq!(hb.interval_ms(), 25000);
        assert_eq!(hb.timeout_ms(), 20000);
    }
}
