//! Structured logging for sigdash.
//!
//! JSON output in production (`RUST_ENV=production`), pretty output
//! otherwise. `RUST_LOG` always wins over the configured filter.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, LogFormat, TelemetryConfig, DEFAULT_FILTER};
