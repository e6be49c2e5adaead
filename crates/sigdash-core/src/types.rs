//! Closed vocabularies for signal direction, signal time and operating mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Signal direction.
///
/// Producers disagree on wording, so parsing accepts several vocabularies
/// case-insensitively:
/// - `UP`, `BUY`, `CALL`, `BULLISH` map to `Up`
/// - `DOWN`, `SELL`, `PUT`, `BEARISH` map to `Down`
///
/// Anything else (including `HOLD`) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        const UP: [&str; 4] = ["up", "buy", "call", "bullish"];
        const DOWN: [&str; 4] = ["down", "sell", "put", "bearish"];

        if UP.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
            Ok(Self::Up)
        } else if DOWN.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
            Ok(Self::Down)
        } else {
            Err(CoreError::InvalidRecord(format!(
                "unmappable direction {trimmed:?}"
            )))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// When a signal was generated, as reported by its producer.
///
/// Producers send either an epoch number or a preformatted string. Both
/// forms are kept verbatim; they are only ever compared for equality
/// (dedup) or ordering, never converted. Fractional epochs are carried as
/// their JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalTime {
    /// Epoch timestamp (unit chosen by the producer).
    Epoch(i64),
    /// Free-form text such as `"10:00"` or `"2024-05-01 10:00:00"`.
    Text(String),
}

impl fmt::Display for SignalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epoch(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Server-persisted operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum TradingMode {
    Live,
    Test,
}

impl TradingMode {
    /// Returns the other mode.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Live => Self::Test,
            Self::Test => Self::Live,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Test => "TEST",
        }
    }
}

impl FromStr for TradingMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("live") {
            Ok(Self::Live)
        } else if trimmed.eq_ignore_ascii_case("test") {
            Ok(Self::Test)
        } else {
            Err(CoreError::InvalidMode(trimmed.to_string()))
        }
    }
}

impl TryFrom<String> for TradingMode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_vocabularies() {
        for word in ["up", "UP", "Buy", " call ", "bullish"] {
            assert_eq!(word.parse::<Direction>().unwrap(), Direction::Up, "{word}");
        }
        for word in ["down", "SELL", "Put", "BEARISH"] {
            assert_eq!(word.parse::<Direction>().unwrap(), Direction::Down, "{word}");
        }
    }

    #[test]
    fn test_direction_rejects_hold() {
        let err = "HOLD".parse::<Direction>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidRecord(_)));
        assert!("No signals yet".parse::<Direction>().is_err());
        assert!("".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::Up).unwrap(), "\"UP\"");
        assert_eq!(Direction::Down.to_string(), "DOWN");
        assert_eq!(Direction::Up.opposite(), Direction::Down);
    }

    #[test]
    fn test_signal_time_untagged() {
        let text: SignalTime = serde_json::from_str("\"10:00\"").unwrap();
        assert_eq!(text, SignalTime::Text("10:00".to_string()));

        let epoch: SignalTime = serde_json::from_str("1706400000000").unwrap();
        assert_eq!(epoch, SignalTime::Epoch(1_706_400_000_000));

        assert!(serde_json::from_str::<SignalTime>("null").is_err());
    }

    #[test]
    fn test_trading_mode_parse_case_insensitive() {
        assert_eq!("live".parse::<TradingMode>().unwrap(), TradingMode::Live);
        assert_eq!("TEST".parse::<TradingMode>().unwrap(), TradingMode::Test);
        assert!("paper".parse::<TradingMode>().is_err());
    }

    #[test]
    fn test_trading_mode_serde() {
        let mode: TradingMode = serde_json::from_str("\"Test\"").unwrap();
        assert_eq!(mode, TradingMode::Test);
        assert_eq!(serde_json::to_string(&TradingMode::Live).unwrap(), "\"LIVE\"");
        assert!(serde_json::from_str::<TradingMode>("\"OFF\"").is_err());
    }

    #[test]
    fn test_trading_mode_toggled() {
        assert_eq!(TradingMode::Live.toggled(), TradingMode::Test);
        assert_eq!(TradingMode::Test.toggled().label(), "LIVE");
    }
}
