//! Core domain types for the sigdash dashboard client.
//!
//! This crate provides the types shared by every other sigdash crate:
//! - `SignalRecord`: one normalized trading signal observation
//! - `Direction`, `SignalTime`, `DedupKey`: signal identity
//! - `TradingMode`: LIVE / TEST operating mode
//! - `Clock`: injectable time source
//! - `PushEvent`: messages delivered by the push transport

pub mod clock;
pub mod error;
pub mod push;
pub mod signal;
pub mod types;

pub use clock::{Clock, DynClock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use push::{PushEvent, PushStatus};
pub use signal::{normalize, DedupKey, RawSignal, SignalRecord};
pub use types::{Direction, SignalTime, TradingMode};
