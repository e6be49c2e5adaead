//! Operating mode controller for sigdash.
//!
//! Tracks the server-confirmed LIVE/TEST mode and the optimistic state
//! shown while a toggle request is in flight.

pub mod controller;
pub mod error;

pub use controller::{ModeController, ModeState, ModeView, ReconcileOutcome};
pub use error::{ModeError, ModeResult};
