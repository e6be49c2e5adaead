//! Plain-text rendering of `DisplayState`.

use chrono::{DateTime, Utc};
use sigdash_sync::{DisplayState, NoticeLevel};
use std::io::{self, Write};

const TIME_FORMAT: &str = "%H:%M:%S";
const RULE_WIDTH: usize = 60;

/// Write one frame: header, notice, then the signal table newest first.
pub fn render(state: &DisplayState, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

    let pending = if state.mode.toggle_pending {
        " (switching...)"
    } else {
        ""
    };
    writeln!(
        out,
        "Mode: {}{}   Last update: {}",
        state.mode.label(),
        pending,
        state.last_update_display().unwrap_or("-")
    )?;

    let stale = if state.is_stale() { " [stale]" } else { "" };
    writeln!(
        out,
        "Push: {}{}   Last poll: {}",
        state.push_status,
        stale,
        format_time(state.last_poll_at)
    )?;

    if let Some(signal_time) = &state.last_push_signal_time {
        writeln!(
            out,
            "Last push: {} (received {})",
            signal_time,
            format_time(state.last_push_received_at)
        )?;
    }

    if let Some(notice) = &state.notice {
        let tag = match notice.level {
            NoticeLevel::Warning => "WARN",
            NoticeLevel::Error => "ERROR",
        };
        writeln!(out, "[{tag}] {}", notice.message)?;
    }

    if state.signals.is_empty() {
        writeln!(out, "No signals yet")?;
    } else {
        writeln!(
            out,
            "{:<12} {:<5} {:<6} {:<20} {:>5}",
            "SYMBOL", "DIR", "TF", "TIME", "CONF"
        )?;
        for record in state.newest_first() {
            let confidence = record
                .confidence()
                .map(|c| format!("{c:.0}"))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                out,
                "{:<12} {:<5} {:<6} {:<20} {:>5}",
                record.symbol(),
                record.direction().to_string(),
                record.timeframe(),
                record.signal_time().to_string(),
                confidence
            )?;
        }
    }

    out.flush()
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sigdash_core::{normalize, PushStatus, TradingMode};
    use sigdash_sync::Notice;

    fn render_to_string(state: &DisplayState) -> String {
        let mut buf = Vec::new();
        render(state, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_render_empty_state() {
        let text = render_to_string(&DisplayState::default());
        assert!(text.contains("Mode: UNKNOWN"));
        assert!(text.contains("[stale]"));
        assert!(text.contains("No signals yet"));
    }

    #[test]
    fn test_render_signals_newest_first() {
        let now = Utc::now();
        let signals: Vec<_> = [
            json!({"symbol": "BTC", "direction": "up", "timeframe": "1H", "time": "10:00"}),
            json!({"symbol": "ETH", "signal": "SELL", "timeframe": "4H", "time": "11:00", "confidence": 72.4}),
        ]
        .iter()
        .map(|raw| normalize(raw, now).unwrap())
        .collect();

        let mut state = DisplayState {
            signals: signals.into(),
            push_status: PushStatus::Connected,
            ..Default::default()
        };
        state.mode.confirmed = Some(TradingMode::Test);
        state.mode.displayed = Some(TradingMode::Live);
        state.mode.toggle_pending = true;

        let text = render_to_string(&state);
        assert!(text.contains("Mode: LIVE (switching...)"));
        assert!(!text.contains("[stale]"));

        let eth = text.find("ETH").unwrap();
        let btc = text.find("BTC").unwrap();
        assert!(eth < btc, "newest record must come first:\n{text}");
        assert!(text.contains("DOWN"));
        assert!(text.contains("72"));
    }

    #[test]
    fn test_render_notice() {
        let state = DisplayState {
            notice: Some(Notice {
                level: NoticeLevel::Error,
                message: "Mode toggle failed: HTTP 500: boom".to_string(),
                raised_at: Utc::now(),
            }),
            ..Default::default()
        };
        let text = render_to_string(&state);
        assert!(text.contains("[ERROR] Mode toggle failed"));
    }
}
