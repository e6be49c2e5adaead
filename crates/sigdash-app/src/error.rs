//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error: {0}")]
    Api(#[from] sigdash_api::ApiError),

    #[error("Sync error: {0}")]
    Sync(#[from] sigdash_sync::SyncError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] sigdash_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
