//! Signal records and their normalization.
//!
//! Snapshot entries and push payloads arrive as loosely shaped JSON. Two
//! producers disagree on the direction field name (`direction` vs `signal`),
//! so both are accepted with a fixed precedence: `direction` first, then
//! `signal`. Everything downstream only ever sees `SignalRecord`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::{Direction, SignalTime};

/// Raw signal entry as sent by the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSignal {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub signal: Option<String>,
    /// Opaque label; non-string values are kept as their JSON text.
    #[serde(default)]
    pub timeframe: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
    /// Producer confidence (0-100), optional. Display only, so unusable
    /// values are dropped rather than failing the record.
    #[serde(default)]
    pub confidence: Option<Value>,
}

impl RawSignal {
    /// Parse a raw JSON value.
    pub fn from_value(raw: &Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(CoreError::InvalidRecord(format!(
                "expected object, got {}",
                json_kind(raw)
            )));
        }
        Self::deserialize(raw).map_err(|e| CoreError::InvalidRecord(e.to_string()))
    }

    /// Convert into a validated record stamped with `received_at`.
    pub fn into_record(self, received_at: DateTime<Utc>) -> Result<SignalRecord> {
        let symbol = self
            .symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::InvalidRecord("missing symbol".to_string()))?;

        let direction = match (self.direction.as_deref(), self.signal.as_deref()) {
            (Some(d), _) => d.parse::<Direction>()?,
            (None, Some(s)) => s.parse::<Direction>()?,
            (None, None) => {
                return Err(CoreError::InvalidRecord(format!(
                    "{symbol}: missing direction/signal"
                )))
            }
        };

        let signal_time = self
            .time
            .as_ref()
            .and_then(signal_time_from_value)
            .ok_or_else(|| CoreError::InvalidRecord(format!("{symbol}: missing time")))?;

        let timeframe = match self.timeframe {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        let confidence = match self.confidence {
            None | Some(Value::Null) => None,
            Some(value) => {
                let parsed = confidence_from_value(&value);
                if parsed.is_none() {
                    debug!(%symbol, confidence = %value, "Ignoring unusable confidence");
                }
                parsed
            }
        };

        Ok(SignalRecord {
            symbol,
            direction,
            timeframe,
            signal_time,
            received_at,
            confidence,
        })
    }
}

/// Integer epochs stay numeric; fractional epochs keep their JSON text so
/// the key stays hashable. Blank strings count as missing.
fn signal_time_from_value(value: &Value) -> Option<SignalTime> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(v) => Some(SignalTime::Epoch(v)),
            None => Some(SignalTime::Text(n.to_string())),
        },
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| SignalTime::Text(trimmed.to_string()))
        }
        _ => None,
    }
}

fn confidence_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|c| c.is_finite())
}

/// Normalize one raw entry into a `SignalRecord`.
///
/// `received_at` is the caller's local clock reading; any timestamp in the
/// payload other than `time` is ignored.
pub fn normalize(raw: &Value, received_at: DateTime<Utc>) -> Result<SignalRecord> {
    RawSignal::from_value(raw)?.into_record(received_at)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Identity of a signal event.
///
/// Two records with the same key describe the same event, regardless of
/// timeframe, confidence or when they were received.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub symbol: String,
    pub signal_time: SignalTime,
    pub direction: Direction,
}

/// One normalized trading signal observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    symbol: String,
    direction: Direction,
    timeframe: String,
    signal_time: SignalTime,
    received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

impl SignalRecord {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn signal_time(&self) -> &SignalTime {
        &self.signal_time
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Dedup key `(symbol, signal_time, direction)`.
    pub fn key(&self) -> DedupKey {
        DedupKey {
            symbol: self.symbol.clone(),
            signal_time: self.signal_time.clone(),
            direction: self.direction,
        }
    }

    /// Check identity against a key without allocating.
    pub fn matches(&self, key: &DedupKey) -> bool {
        self.direction == key.direction
            && self.signal_time == key.signal_time
            && self.symbol == key.symbol
    }

    /// Same record carrying an earlier receipt time.
    ///
    /// Used when a snapshot re-delivers a record that was already ingested.
    pub fn with_received_at(self, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            ..self
        }
    }
}
