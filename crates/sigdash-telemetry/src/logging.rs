//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor config provide one.
pub const DEFAULT_FILTER: &str = "info,sigdash=debug";

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON when `RUST_ENV=production`, pretty otherwise.
    #[default]
    Auto,
    Json,
    Pretty,
}

/// Logging configuration (`[telemetry]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info,sigdash=debug`.
    #[serde(default = "default_filter")]
    pub log_level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_filter(),
            format: LogFormat::Auto,
        }
    }
}

impl TelemetryConfig {
    fn resolved_format(&self) -> LogFormat {
        match self.format {
            LogFormat::Auto => {
                let is_production = std::env::var("RUST_ENV")
                    .map(|v| v == "production")
                    .unwrap_or(false);
                if is_production {
                    LogFormat::Json
                } else {
                    LogFormat::Pretty
                }
            }
            explicit => explicit,
        }
    }
}

/// Initialize logging with the default filter.
pub fn init_logging() -> TelemetryResult<()> {
    init_logging_with(&TelemetryConfig::default())
}

/// Initialize logging from config.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with(config: &TelemetryConfig) -> TelemetryResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.log_level)?,
    };

    let result = match config.resolved_format() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true).with_thread_names(true))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn parse_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })
}
