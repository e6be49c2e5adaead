//! LIVE/TEST mode state machine.
//!
//! The confirmed mode changes only through `reconcile`, which is driven by
//! server responses (bootstrap, poll, toggle response). A toggle is a
//! request: `begin_toggle` only records an optimistic target for display,
//! and `fail_toggle` drops it again so the display falls back to the last
//! confirmed mode.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use sigdash_core::{DynClock, TradingMode};
use tracing::{debug, info, warn};

use crate::error::{ModeError, ModeResult};

/// Server formats seen for `lastUpdate` besides RFC 3339.
const SERVER_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Display format for locally stamped updates.
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Last server-confirmed mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeState {
    pub mode: TradingMode,
    /// Server-provided update time when parseable, local clock otherwise.
    pub last_update: DateTime<Utc>,
    /// Raw `lastUpdate` text from the server, if any.
    pub server_update: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingToggle {
    target: TradingMode,
    requested_at: DateTime<Utc>,
}

/// Result of `reconcile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Mode changed (or was confirmed for the first time).
    Changed {
        from: Option<TradingMode>,
        to: TradingMode,
    },
    /// Same mode; only `last_update` was refreshed.
    Refreshed,
}

/// Read-only view for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ModeView {
    /// Last server-confirmed mode.
    pub confirmed: Option<TradingMode>,
    /// Mode to show: the optimistic target while a toggle is pending.
    pub displayed: Option<TradingMode>,
    pub toggle_pending: bool,
    pub last_update: Option<String>,
}

impl ModeView {
    /// Label for the toggle button / header.
    pub fn label(&self) -> &'static str {
        self.displayed.map(|m| m.label()).unwrap_or("UNKNOWN")
    }
}

/// Owner of the session's single `ModeState`.
pub struct ModeController {
    confirmed: Option<ModeState>,
    pending: Option<PendingToggle>,
    clock: DynClock,
}

impl ModeController {
    /// Create a controller with no confirmed mode yet.
    pub fn new(clock: DynClock) -> Self {
        Self {
            confirmed: None,
            pending: None,
            clock,
        }
    }

    /// Apply a server-reported mode.
    ///
    /// Always sets the confirmed mode and refreshes `last_update`, using
    /// `server_update` when it parses and the local clock otherwise.
    /// Reconciling with the current mode is a no-op beyond that refresh.
    pub fn reconcile(
        &mut self,
        server_mode: TradingMode,
        server_update: Option<&str>,
    ) -> ReconcileOutcome {
        let last_update = server_update
            .and_then(parse_server_time)
            .unwrap_or_else(|| self.clock.now());
        let previous = self.confirmed.as_ref().map(|s| s.mode);

        self.confirmed = Some(ModeState {
            mode: server_mode,
            last_update,
            server_update: server_update
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        });

        if previous == Some(server_mode) {
            debug!(mode = %server_mode, "Mode reconciled (unchanged)");
            ReconcileOutcome::Refreshed
        } else {
            info!(from = ?previous, to = %server_mode, "Mode reconciled");
            ReconcileOutcome::Changed {
                from: previous,
                to: server_mode,
            }
        }
    }

    /// Start a toggle request.
    ///
    /// Returns the target mode the caller must ask the server for. The
    /// confirmed mode is untouched; only the displayed mode flips.
    pub fn begin_toggle(&mut self) -> ModeResult<TradingMode> {
        if let Some(pending) = self.pending {
            return Err(ModeError::ToggleInFlight(pending.target));
        }
        let current = self
            .confirmed
            .as_ref()
            .map(|s| s.mode)
            .ok_or(ModeError::Unconfirmed)?;

        let target = current.toggled();
        self.pending = Some(PendingToggle {
            target,
            requested_at: self.clock.now(),
        });
        info!(from = %current, to = %target, "Mode toggle requested");
        Ok(target)
    }

    /// Finish a toggle with the server's answer.
    pub fn complete_toggle(&mut self, server_mode: TradingMode) -> ReconcileOutcome {
        if let Some(pending) = self.pending.take() {
            let elapsed_ms = (self.clock.now() - pending.requested_at).num_milliseconds();
            if pending.target != server_mode {
                warn!(
                    requested = %pending.target,
                    server = %server_mode,
                    elapsed_ms,
                    "Server answered toggle with unexpected mode"
                );
            } else {
                debug!(mode = %server_mode, elapsed_ms, "Toggle confirmed");
            }
        }
        self.reconcile(server_mode, None)
    }

    /// Abandon the pending toggle after a failed request.
    ///
    /// Returns the confirmed mode the display reverts to.
    pub fn fail_toggle(&mut self) -> Option<TradingMode> {
        if let Some(pending) = self.pending.take() {
            warn!(requested = %pending.target, "Toggle failed, reverting display");
        }
        self.current()
    }

    /// Last server-confirmed mode.
    pub fn current(&self) -> Option<TradingMode> {
        self.confirmed.as_ref().map(|s| s.mode)
    }

    /// Mode to display (optimistic target while a toggle is pending).
    pub fn displayed(&self) -> Option<TradingMode> {
        self.pending.map(|p| p.target).or_else(|| self.current())
    }

    pub fn is_toggle_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> Option<&ModeState> {
        self.confirmed.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.confirmed.as_ref().map(|s| s.last_update)
    }

    /// `last_update` formatted for display.
    ///
    /// Shows the server's own text when it sent one.
    pub fn last_update_display(&self) -> Option<String> {
        self.confirmed.as_ref().map(|s| match &s.server_update {
            Some(raw) => raw.clone(),
            None => s.last_update.format(DISPLAY_FORMAT).to_string(),
        })
    }

    pub fn view(&self) -> ModeView {
        ModeView {
            confirmed: self.current(),
            displayed: self.displayed(),
            toggle_pending: self.is_toggle_pending(),
            last_update: self.last_update_display(),
        }
    }
}

impl std::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeController")
            .field("confirmed", &self.confirmed)
            .field("pending", &self.pending)
            .finish()
    }
}

fn parse_server_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    SERVER_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}
