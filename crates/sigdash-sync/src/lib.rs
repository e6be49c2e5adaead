//! Sync loop for sigdash.
//!
//! One task owns the feed and the mode controller. Snapshot polls, push
//! events and toggle requests are independent producers that report into
//! that task over channels, so feed and mode mutations never interleave.
//! Each batch of mutations publishes one `DisplayState` on a watch channel.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod state;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use orchestrator::{SyncCommand, SyncHandle, SyncOrchestrator};
pub use state::{DisplayState, Notice, NoticeLevel};
