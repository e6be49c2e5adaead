//! Shared mock servers.

pub mod mock_push;
pub mod mock_rest;

use sigdash_sync::{DisplayState, SyncHandle};
use std::time::Duration;

/// Wait until the published state satisfies `condition`.
pub async fn wait_for_state(
    handle: &SyncHandle,
    condition: impl FnMut(&DisplayState) -> bool,
) -> DisplayState {
    let mut rx = handle.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(condition))
        .await
        .expect("timed out waiting for display state")
        .expect("sync loop stopped");
    state.clone()
}
