//! Application configuration.

use crate::error::{AppError, AppResult};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use sigdash_sync::SyncConfig;
use sigdash_telemetry::TelemetryConfig;
use sigdash_ws::{ConnectionConfig, Framing};
use std::time::Duration;

/// Config file used when neither `--config` nor `SIGDASH_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "SIGDASH_CONFIG";

/// Prefix for per-key overrides, e.g. `SIGDASH__SYNC__POLL_INTERVAL_MS=5000`.
pub const ENV_PREFIX: &str = "SIGDASH";

/// Push transport configuration (`[websocket]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsConfig {
    #[serde(default)]
    pub framing: Framing,
    /// Event carrying new signals.
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Used until the server announces its own ping cadence.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

fn default_event_name() -> String {
    "new_signal".to_string()
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60000
}

fn default_heartbeat_interval_ms() -> u64 {
    25000
}

fn default_heartbeat_timeout_ms() -> u64 {
    20000
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            event_name: default_event_name(),
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl From<WsConfig> for ConnectionConfig {
    fn from(cfg: WsConfig) -> Self {
        Self {
            url: String::new(), // Set separately
            framing: cfg.framing,
            event_name: cfg.event_name,
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
            heartbeat_interval_ms: cfg.heartbeat_interval_ms,
            heartbeat_timeout_ms: cfg.heartbeat_timeout_ms,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Signal server REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    #[serde(default = "default_toggle_path")]
    pub toggle_path: String,
    /// Push endpoint. For Socket.IO this is the Engine.IO WebSocket URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub websocket: WsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_snapshot_path() -> String {
    "/snapshot".to_string()
}

fn default_toggle_path() -> String {
    "/toggle_mode".to_string()
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:5000/socket.io/?EIO=4&transport=websocket".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            snapshot_path: default_snapshot_path(),
            toggle_path: default_toggle_path(),
            ws_url: default_ws_url(),
            sync: SyncConfig::default(),
            websocket: WsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the config path: explicit arg > `SIGDASH_CONFIG` > default.
    ///
    /// The second value tells whether the file must exist.
    pub fn resolve_path(explicit: Option<String>) -> (String, bool) {
        match explicit.or_else(|| std::env::var(CONFIG_PATH_ENV).ok()) {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_PATH.to_string(), false),
        }
    }

    /// Load the TOML file at `path` layered with `SIGDASH__*` overrides.
    pub fn load(path: &str, required: bool) -> AppResult<Self> {
        let builder = config::Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(required))
            .add_source(env_source());
        Self::build(builder)
    }

    /// Parse TOML text layered with `SIGDASH__*` overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let builder = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(env_source());
        Self::build(builder)
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> AppResult<Self> {
        let config: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| AppError::Config(format!("Failed to load config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "base_url must be http(s), got {:?}",
                self.base_url
            )));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "ws_url must be ws(s), got {:?}",
                self.ws_url
            )));
        }
        if self.sync.capacity == 0 {
            return Err(AppError::Config("sync.capacity must be positive".to_string()));
        }
        if self.sync.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "sync.request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        self.sync.request_timeout()
    }

    /// Push connection settings with the URL filled in.
    pub fn connection_config(&self) -> ConnectionConfig {
        let mut connection: ConnectionConfig = self.websocket.clone().into();
        connection.url = self.ws_url.clone();
        connection
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {e}")))
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigdash_telemetry::LogFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.websocket.event_name, "new_signal");
    }

    #[test]
    fn test_from_toml_str() {
        let config = AppConfig::from_toml_str(
            r#"
            base_url = "http://signals.local:8080"
            ws_url = "wss://signals.local:8080/socket.io/?EIO=4&transport=websocket"

            [sync]
            poll_interval_ms = 15000
            capacity = 20

            [websocket]
            framing = "json"
            max_reconnect_attempts = 5

            [telemetry]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://signals.local:8080");
        assert_eq!(config.snapshot_path, "/snapshot");
        assert_eq!(config.sync.poll_interval_ms, 15000);
        assert_eq!(config.sync.capacity, 20);
        assert_eq!(config.sync.request_timeout_ms, 10000);
        assert_eq!(config.telemetry.format, LogFormat::Json);

        let connection = config.connection_config();
        assert_eq!(connection.url, config.ws_url);
        assert_eq!(connection.framing, Framing::Json);
        assert_eq!(connection.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = AppConfig {
            ws_url: "http://wrong".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let err = AppConfig::from_toml_str("base_url = \"ftp://x\"").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let err = AppConfig::from_toml_str("[sync]\ncapacity = 0").unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml", false).unwrap();
        assert_eq!(config.base_url, default_base_url());
        assert!(AppConfig::load("does/not/exist.toml", true).is_err());
    }

    #[test]
    fn test_resolve_path_prefers_explicit() {
        let (path, required) = AppConfig::resolve_path(Some("custom.toml".to_string()));
        assert_eq!(path, "custom.toml");
        assert!(required);
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = AppConfig::default().to_toml().unwrap();
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("[sync]"));
        assert!(toml_str.contains("poll_interval_ms"));
    }
}
