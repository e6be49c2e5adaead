//! Sync loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sync loop configuration (`[sync]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Snapshot poll period. Default: 60,000 (60 seconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on every snapshot/toggle request. Default: 10,000 (10 seconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a user-visible notice stays up. Default: 5,000 (5 seconds).
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
    /// Feed capacity. Default: 50.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_notice_ttl_ms() -> u64 {
    5_000
}

fn default_capacity() -> usize {
    sigdash_feed::DEFAULT_CAPACITY
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
            capacity: default_capacity(),
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.notice_ttl(), Duration::from_secs(5));
        assert_eq!(config.capacity, 50);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: SyncConfig = serde_json::from_str(r#"{"poll_interval_ms":5000}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.capacity, 50);
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config = SyncConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }
}
