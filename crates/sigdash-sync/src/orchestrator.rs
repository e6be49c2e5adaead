//! The sequential sync loop.
//!
//! `SyncOrchestrator::run` owns the feed and the mode controller. Endpoint
//! calls run in spawned tasks bounded by the request timeout and report back
//! over an internal channel; only this loop applies their results. After each
//! wake-up, everything that is already queued is applied before a single
//! `DisplayState` is published.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sigdash_api::{ApiError, ApiResult, DynSignalApi, SnapshotResponse};
use sigdash_core::{DynClock, PushEvent, PushStatus, SignalTime, TradingMode};
use sigdash_feed::{AppendOutcome, BoundedSignalFeed};
use sigdash_mode::ModeController;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::state::{DisplayState, Notice, NoticeLevel};

const COMMAND_BUFFER: usize = 32;
const INBOUND_BUFFER: usize = 8;

/// Upper bound on queued items applied before a publish.
const MAX_BATCH: usize = 256;

/// Requests from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    /// Flip LIVE/TEST.
    RequestToggle,
    /// Poll the snapshot now instead of waiting for the next tick.
    PollNow,
}

/// Results reported back by spawned request tasks.
#[derive(Debug)]
enum Inbound {
    PollCompleted {
        generation: u64,
        result: ApiResult<SnapshotResponse>,
    },
    ToggleCompleted(ApiResult<TradingMode>),
}

/// Front-end side of the sync loop.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    state: watch::Receiver<DisplayState>,
    shutdown: CancellationToken,
}

impl SyncHandle {
    pub async fn request_toggle(&self) -> SyncResult<()> {
        self.send(SyncCommand::RequestToggle).await
    }

    pub async fn poll_now(&self) -> SyncResult<()> {
        self.send(SyncCommand::PollNow).await
    }

    pub async fn send(&self, command: SyncCommand) -> SyncResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Closed)
    }

    /// Receiver notified after every publish.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.clone()
    }

    /// Latest published state.
    pub fn current(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    /// End the session.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Owner of the session's feed and mode state.
pub struct SyncOrchestrator {
    config: SyncConfig,
    api: DynSignalApi,
    clock: DynClock,
    feed: BoundedSignalFeed,
    mode: ModeController,

    push_rx: mpsc::Receiver<PushEvent>,
    push_open: bool,
    command_rx: mpsc::Receiver<SyncCommand>,
    inbound_tx: mpsc::Sender<Inbound>,
    inbound_rx: mpsc::Receiver<Inbound>,
    state_tx: watch::Sender<DisplayState>,
    shutdown: CancellationToken,

    push_status: PushStatus,
    last_poll_at: Option<DateTime<Utc>>,
    server_last_update: Option<String>,
    last_push_received_at: Option<DateTime<Utc>>,
    last_push_signal_time: Option<SignalTime>,
    notice: Option<Notice>,
    notice_deadline: Option<Instant>,

    poll_in_flight: bool,
    /// Bumped when a toggle response confirms a mode. A poll started under an
    /// older generation may carry the pre-toggle mode, so its mode is dropped.
    mode_generation: u64,
    revision: u64,
    dirty: bool,
}

impl SyncOrchestrator {
    /// Create the loop and its handle. Nothing runs until `run` is awaited.
    pub fn new(
        config: SyncConfig,
        api: DynSignalApi,
        clock: DynClock,
        push_rx: mpsc::Receiver<PushEvent>,
        shutdown: CancellationToken,
    ) -> (Self, SyncHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (state_tx, state_rx) = watch::channel(DisplayState::default());

        let handle = SyncHandle {
            commands: command_tx,
            state: state_rx,
            shutdown: shutdown.clone(),
        };

        let orchestrator = Self {
            feed: BoundedSignalFeed::new(config.capacity, clock.clone()),
            mode: ModeController::new(clock.clone()),
            config,
            api,
            clock,
            push_rx,
            push_open: true,
            command_rx,
            inbound_tx,
            inbound_rx,
            state_tx,
            shutdown,
            push_status: PushStatus::default(),
            last_poll_at: None,
            server_last_update: None,
            last_push_received_at: None,
            last_push_signal_time: None,
            notice: None,
            notice_deadline: None,
            poll_in_flight: false,
            mode_generation: 0,
            revision: 0,
            dirty: false,
        };

        (orchestrator, handle)
    }

    /// Bootstrap, then process events until shutdown.
    ///
    /// Returns when the session token is cancelled or every `SyncHandle`
    /// has been dropped.
    pub async fn run(mut self) {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            request_timeout_ms = self.config.request_timeout_ms,
            capacity = self.feed.capacity(),
            "Sync loop starting"
        );

        // Push events queue up in their channel until the bootstrap is applied.
        tokio::select! {
            biased;

            () = self.shutdown.cancelled() => {
                info!("Shutdown requested during bootstrap");
                return;
            }

            result = fetch_snapshot(&self.api, self.config.request_timeout()) => {
                let generation = self.mode_generation;
                self.apply_poll(generation, result);
            }
        }
        self.publish_if_dirty();

        let period = self.config.poll_interval();
        let mut poll_timer = tokio::time::interval_at(Instant::now() + period, period);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let notice_deadline = self.notice_deadline;

            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }

                Some(inbound) = self.inbound_rx.recv() => self.handle_inbound(inbound),

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("All sync handles dropped");
                        break;
                    }
                },

                event = self.push_rx.recv(), if self.push_open => match event {
                    Some(event) => self.handle_push(event),
                    None => {
                        warn!("Push channel closed, continuing with polling only");
                        self.push_open = false;
                    }
                },

                _ = poll_timer.tick() => self.start_poll("timer"),

                () = wait_until(notice_deadline) => self.expire_notice(),
            }

            self.drain_ready();
            self.publish_if_dirty();
        }

        info!(revision = self.revision, "Sync loop stopped");
    }

    /// Apply everything already queued so it lands in one publish.
    fn drain_ready(&mut self) {
        for _ in 0..MAX_BATCH {
            // Results arriving after teardown are discarded.
            if self.shutdown.is_cancelled() {
                return;
            }
            if let Ok(inbound) = self.inbound_rx.try_recv() {
                self.handle_inbound(inbound);
                continue;
            }
            if let Ok(command) = self.command_rx.try_recv() {
                self.handle_command(command);
                continue;
            }
            if self.push_open {
                if let Ok(event) = self.push_rx.try_recv() {
                    self.handle_push(event);
                    continue;
                }
            }
            return;
        }
    }

    fn handle_command(&mut self, command: SyncCommand) {
        debug!(?command, "Command received");
        match command {
            SyncCommand::RequestToggle => self.start_toggle(),
            SyncCommand::PollNow => self.start_poll("manual"),
        }
    }

    fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::PollCompleted { generation, result } => {
                self.poll_in_flight = false;
                self.apply_poll(generation, result);
            }
            Inbound::ToggleCompleted(result) => self.apply_toggle(result),
        }
    }

    fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Signal(payload) => {
                if let AppendOutcome::Appended { evicted } = self.feed.append(&payload) {
                    if let Some(record) = self.feed.latest() {
                        debug!(
                            symbol = %record.symbol(),
                            direction = %record.direction(),
                            evicted,
                            "Push signal appended"
                        );
                        self.last_push_received_at = Some(record.received_at());
                        self.last_push_signal_time = Some(record.signal_time().clone());
                    }
                    self.dirty = true;
                }
            }
            PushEvent::Status(status) => {
                if status != self.push_status {
                    info!(from = %self.push_status, to = %status, "Push status changed");
                    self.push_status = status;
                    self.dirty = true;
                }
            }
        }
    }

    fn start_poll(&mut self, reason: &'static str) {
        if self.poll_in_flight {
            debug!(reason, "Snapshot poll already in flight, skipping");
            return;
        }
        self.poll_in_flight = true;
        debug!(reason, "Starting snapshot poll");

        let api = self.api.clone();
        let timeout = self.config.request_timeout();
        let tx = self.inbound_tx.clone();
        let generation = self.mode_generation;
        tokio::spawn(async move {
            let result = fetch_snapshot(&api, timeout).await;
            if tx
                .send(Inbound::PollCompleted { generation, result })
                .await
                .is_err()
            {
                debug!("Sync loop gone, discarding poll result");
            }
        });
    }

    fn apply_poll(&mut self, generation: u64, result: ApiResult<SnapshotResponse>) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Snapshot poll failed, keeping current state");
                return;
            }
        };

        let summary = self.feed.replace_all(&snapshot.signals);
        if generation == self.mode_generation {
            self.mode
                .reconcile(snapshot.mode, snapshot.last_update.as_deref());
            self.server_last_update = snapshot.last_update;
        } else {
            debug!(
                mode = %snapshot.mode,
                "Ignoring mode from a poll started before the last toggle"
            );
        }

        self.last_poll_at = Some(self.clock.now());
        self.dirty = true;

        info!(
            signals = summary.accepted,
            skipped = summary.skipped_invalid + summary.skipped_duplicate,
            changed = summary.changed,
            mode = %snapshot.mode,
            "Snapshot applied"
        );
    }

    fn start_toggle(&mut self) {
        let target = match self.mode.begin_toggle() {
            Ok(target) => target,
            Err(e) => {
                warn!(error = %e, "Toggle rejected");
                self.raise_notice(NoticeLevel::Warning, e.to_string());
                return;
            }
        };
        // Optimistic display flip.
        self.dirty = true;

        let api = self.api.clone();
        let timeout = self.config.request_timeout();
        let tx = self.inbound_tx.clone();
        debug!(%target, "Sending toggle request");
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, api.toggle_mode())
                .await
                .unwrap_or_else(|_| Err(ApiError::Timeout(timeout)));
            if tx.send(Inbound::ToggleCompleted(result)).await.is_err() {
                debug!("Sync loop gone, discarding toggle result");
            }
        });
    }

    fn apply_toggle(&mut self, result: ApiResult<TradingMode>) {
        match result {
            Ok(mode) => {
                self.mode.complete_toggle(mode);
                self.mode_generation += 1;
            }
            Err(e) => {
                let reverted = self.mode.fail_toggle();
                warn!(error = %e, reverted = ?reverted, "Mode toggle failed");
                self.raise_notice(NoticeLevel::Error, format!("Mode toggle failed: {e}"));
            }
        }
        self.dirty = true;
    }

    fn raise_notice(&mut self, level: NoticeLevel, message: String) {
        self.notice = Some(Notice {
            level,
            message,
            raised_at: self.clock.now(),
        });
        self.notice_deadline = Some(Instant::now() + self.config.notice_ttl());
        self.dirty = true;
    }

    fn expire_notice(&mut self) {
        self.notice_deadline = None;
        if self.notice.take().is_some() {
            self.dirty = true;
        }
    }

    fn publish_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.revision += 1;

        let state = self.display_state();
        debug!(
            revision = state.revision,
            signals = state.signals.len(),
            mode = state.mode.label(),
            "Publishing display state"
        );
        self.state_tx.send_replace(state);
    }

    fn display_state(&self) -> DisplayState {
        DisplayState {
            signals: self.feed.snapshot(),
            mode: self.mode.view(),
            push_status: self.push_status,
            last_poll_at: self.last_poll_at,
            server_last_update: self.server_last_update.clone(),
            last_push_received_at: self.last_push_received_at,
            last_push_signal_time: self.last_push_signal_time.clone(),
            notice: self.notice.clone(),
            revision: self.revision,
        }
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("feed", &self.feed)
            .field("mode", &self.mode)
            .field("push_status", &self.push_status)
            .field("poll_in_flight", &self.poll_in_flight)
            .field("revision", &self.revision)
            .finish()
    }
}

async fn fetch_snapshot(api: &DynSignalApi, timeout: Duration) -> ApiResult<SnapshotResponse> {
    tokio::time::timeout(timeout, api.fetch_snapshot())
        .await
        .unwrap_or_else(|_| Err(ApiError::Timeout(timeout)))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
