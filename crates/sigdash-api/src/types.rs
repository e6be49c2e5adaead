//! Wire types for the REST endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigdash_core::TradingMode;

/// `GET /snapshot` response.
///
/// Signals stay raw JSON here; each entry is normalized individually by the
/// feed so one malformed entry cannot fail the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub mode: TradingMode,
    #[serde(default, alias = "last_update", rename = "lastUpdate")]
    pub last_update: Option<String>,
    #[serde(default)]
    pub signals: Vec<Value>,
}

/// `POST /toggle_mode` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub mode: TradingMode,
}
