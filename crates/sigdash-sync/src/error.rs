//! Sync handle error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Sync loop is not running")]
    Closed,
}

pub type SyncResult<T> = Result<T, SyncError>;
