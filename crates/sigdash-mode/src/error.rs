//! Mode controller error types.

use sigdash_core::TradingMode;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("Mode not confirmed by server yet")]
    Unconfirmed,

    #[error("Toggle to {0} already in flight")]
    ToggleInFlight(TradingMode),
}

pub type ModeResult<T> = Result<T, ModeError>;
