//! Read-only state published to renderers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sigdash_core::{PushStatus, SignalRecord, SignalTime, TradingMode};
use sigdash_feed::FeedSnapshot;
use sigdash_mode::ModeView;

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Transient user-visible message (e.g. a failed toggle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Everything a renderer needs, published after each batch of mutations.
#[derive(Debug, Clone)]
pub struct DisplayState {
    /// Feed records, oldest first.
    pub signals: FeedSnapshot,
    pub mode: ModeView,
    pub push_status: PushStatus,
    /// Local time of the last successful snapshot poll.
    pub last_poll_at: Option<DateTime<Utc>>,
    /// Server `lastUpdate` text from the last poll whose mode was reconciled.
    pub server_last_update: Option<String>,
    /// Local receipt time of the last appended push event.
    pub last_push_received_at: Option<DateTime<Utc>>,
    /// Signal time carried by the last appended push event.
    pub last_push_signal_time: Option<SignalTime>,
    pub notice: Option<Notice>,
    /// Incremented on every publish.
    pub revision: u64,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            signals: Arc::from(Vec::new()),
            mode: ModeView::default(),
            push_status: PushStatus::default(),
            last_poll_at: None,
            server_last_update: None,
            last_push_received_at: None,
            last_push_signal_time: None,
            notice: None,
            revision: 0,
        }
    }
}

impl DisplayState {
    /// Last server-confirmed mode.
    pub fn current_mode(&self) -> Option<TradingMode> {
        self.mode.confirmed
    }

    pub fn last_update_display(&self) -> Option<&str> {
        self.mode.last_update.as_deref()
    }

    /// Records newest first, as a signal table shows them.
    pub fn newest_first(&self) -> impl Iterator<Item = &SignalRecord> + '_ {
        self.signals.iter().rev()
    }

    /// Whether pushed signals may be missing because the channel is down.
    pub fn is_stale(&self) -> bool {
        self.push_status != PushStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_empty_and_stale() {
        let state = DisplayState::default();
        assert!(state.signals.is_empty());
        assert!(state.is_stale());
        assert_eq!(state.current_mode(), None);
        assert_eq!(state.mode.label(), "UNKNOWN");
    }

    #[test]
    fn test_newest_first() {
        let now = Utc::now();
        let records: Vec<SignalRecord> = ["BTC", "ETH"]
            .iter()
            .map(|symbol| {
                sigdash_core::normalize(
                    &json!({"symbol": symbol, "direction": "up", "time": "10:00"}),
                    now,
                )
                .unwrap()
            })
            .collect();
        let state = DisplayState {
            signals: records.into(),
            ..Default::default()
        };
        let order: Vec<&str> = state.newest_first().map(|r| r.symbol()).collect();
        assert_eq!(order, vec!["ETH", "BTC"]);
    }
}
