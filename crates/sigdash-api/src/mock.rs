//! Scripted `SignalApi` for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use sigdash_core::TradingMode;

use crate::client::{BoxFuture, SignalApi};
use crate::error::{ApiError, ApiResult};
use crate::types::SnapshotResponse;

/// Mock API returning queued responses.
///
/// When a queue is empty the last configured fallback is returned. Optional
/// delays let tests observe in-flight state.
#[derive(Debug)]
pub struct MockSignalApi {
    snapshots: Mutex<VecDeque<ApiResult<SnapshotResponse>>>,
    snapshot_fallback: Mutex<ApiResult<SnapshotResponse>>,
    toggles: Mutex<VecDeque<ApiResult<TradingMode>>>,
    toggle_fallback: Mutex<ApiResult<TradingMode>>,
    snapshot_delay: Mutex<Option<Duration>>,
    toggle_delay: Mutex<Option<Duration>>,
    snapshot_calls: AtomicUsize,
    toggle_calls: AtomicUsize,
}

impl Default for MockSignalApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSignalApi {
    /// Create a mock whose calls fail until responses are queued.
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(VecDeque::new()),
            snapshot_fallback: Mutex::new(Err(ApiError::Transport("no snapshot queued".into()))),
            toggles: Mutex::new(VecDeque::new()),
            toggle_fallback: Mutex::new(Err(ApiError::Transport("no toggle queued".into()))),
            snapshot_delay: Mutex::new(None),
            toggle_delay: Mutex::new(None),
            snapshot_calls: AtomicUsize::new(0),
            toggle_calls: AtomicUsize::new(0),
        }
    }

    /// Queue one snapshot response.
    pub fn push_snapshot(&self, result: ApiResult<SnapshotResponse>) {
        self.snapshots.lock().push_back(result);
    }

    /// Response used once the snapshot queue is drained.
    pub fn set_snapshot_fallback(&self, result: ApiResult<SnapshotResponse>) {
        *self.snapshot_fallback.lock() = result;
    }

    /// Queue one toggle response.
    pub fn push_toggle(&self, result: ApiResult<TradingMode>) {
        self.toggles.lock().push_back(result);
    }

    /// Response used once the toggle queue is drained.
    pub fn set_toggle_fallback(&self, result: ApiResult<TradingMode>) {
        *self.toggle_fallback.lock() = result;
    }

    pub fn set_snapshot_delay(&self, delay: Option<Duration>) {
        *self.snapshot_delay.lock() = delay;
    }

    pub fn set_toggle_delay(&self, delay: Option<Duration>) {
        *self.toggle_delay.lock() = delay;
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub fn toggle_calls(&self) -> usize {
        self.toggle_calls.load(Ordering::SeqCst)
    }

    fn next_snapshot(&self) -> ApiResult<SnapshotResponse> {
        self.snapshots
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.snapshot_fallback.lock().clone())
    }

    fn next_toggle(&self) -> ApiResult<TradingMode> {
        self.toggles
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.toggle_fallback.lock().clone())
    }
}

impl SignalApi for MockSignalApi {
    fn fetch_snapshot(&self) -> BoxFuture<'_, ApiResult<SnapshotResponse>> {
        Box::pin(async move {
            self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.snapshot_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.next_snapshot()
        })
    }

    fn toggle_mode(&self) -> BoxFuture<'_, ApiResult<TradingMode>> {
        Box::pin(async move {
            self.toggle_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.toggle_delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.next_toggle()
        })
    }
}
