//! REST client for the sigdash server.
//!
//! - `GET /snapshot`: full state (mode, lastUpdate, signals)
//! - `POST /toggle_mode`: flip the persisted mode, returns the new mode
//!
//! The `SignalApi` trait is the seam the sync loop depends on, so tests can
//! swap in `MockSignalApi`.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

pub use client::{BoxFuture, DynSignalApi, HttpSignalApi, SignalApi, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiResult};
pub use mock::MockSignalApi;
pub use types::{SnapshotResponse, ToggleResponse};
