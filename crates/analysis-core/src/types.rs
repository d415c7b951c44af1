use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Calendar date of the bar, used to align series from different symbols.
    pub fn trading_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Lookback window shared by every time-dependent view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeFrame {
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 3] = [TimeFrame::SixMonths, TimeFrame::OneYear, TimeFrame::FiveYears];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::SixMonths => "6mo",
            TimeFrame::OneYear => "1y",
            TimeFrame::FiveYears => "5y",
        }
    }

    /// Calendar days requested from daily crypto history for this window.
    pub fn lookback_days(&self) -> u32 {
        match self {
            TimeFrame::SixMonths => 182,
            TimeFrame::OneYear => 365,
            TimeFrame::FiveYears => 1825,
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "6mo" => Ok(TimeFrame::SixMonths),
            "1y" => Ok(TimeFrame::OneYear),
            "5y" => Ok(TimeFrame::FiveYears),
            other => Err(AnalysisError::InvalidData(format!(
                "Unknown time frame '{}', expected one of 6mo, 1y, 5y",
                other
            ))),
        }
    }
}

/// Current price plus return and volatility over a lookback window.
/// Every field except `current_price` is a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub current_price: f64,
    pub price_change_24h: f64,
    pub annual_return: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            _ => Err(AnalysisError::InvalidData(
                "Invalid option type. Use 'call' or 'put'.".to_string(),
            )),
        }
    }
}

/// Condition attached to a price alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    GreaterThan,
    LessThan,
}

impl ComparisonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonMode::GreaterThan => "Greater Than",
            ComparisonMode::LessThan => "Less Than",
        }
    }

    /// Whether `price` satisfies the condition. Both bounds are inclusive.
    pub fn is_met(&self, price: f64, threshold: f64) -> bool {
        match self {
            ComparisonMode::GreaterThan => price >= threshold,
            ComparisonMode::LessThan => price <= threshold,
        }
    }

    /// Word used in notification text ("above" / "below").
    pub fn direction(&self) -> &'static str {
        match self {
            ComparisonMode::GreaterThan => "above",
            ComparisonMode::LessThan => "below",
        }
    }
}

impl fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "greater than" | "above" | ">" | "1" => Ok(ComparisonMode::GreaterThan),
            "less than" | "below" | "<" | "0" => Ok(ComparisonMode::LessThan),
            _ => Err(AnalysisError::InvalidData(format!(
                "Unknown comparison mode '{}'",
                s
            ))),
        }
    }
}

impl Serialize for ComparisonMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComparisonMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Code(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Code(1) => Ok(ComparisonMode::GreaterThan),
            Repr::Code(0) => Ok(ComparisonMode::LessThan),
            Repr::Code(other) => Err(D::Error::custom(format!(
                "comparison mode must be 1 (greater than) or 0 (less than), got {}",
                other
            ))),
            Repr::Text(text) => text.parse().map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_frame_round_trip_through_str() {
        for tf in TimeFrame::ALL {
            assert_eq!(tf.as_str().parse::<TimeFrame>().unwrap(), tf);
        }
        assert_eq!(" 5Y ".parse::<TimeFrame>().unwrap(), TimeFrame::FiveYears);
        assert!("2y".parse::<TimeFrame>().is_err());
    }

    #[test]
    fn test_time_frame_lookback_days() {
        assert_eq!(TimeFrame::SixMonths.lookback_days(), 182);
        assert_eq!(TimeFrame::OneYear.lookback_days(), 365);
        assert_eq!(TimeFrame::FiveYears.lookback_days(), 1825);
        assert_eq!(TimeFrame::default(), TimeFrame::OneYear);
    }

    #[test]
    fn test_time_frame_serde_uses_short_names() {
        assert_eq!(serde_json::to_string(&TimeFrame::SixMonths).unwrap(), "\"6mo\"");
        let tf: TimeFrame = serde_json::from_str("\"5y\"").unwrap();
        assert_eq!(tf, TimeFrame::FiveYears);
    }

    #[test]
    fn test_comparison_mode_accepts_every_wire_form() {
        for raw in ["\"Greater Than\"", "\">\"", "\"greater_than\"", "1"] {
            let mode: ComparisonMode = serde_json::from_str(raw).unwrap();
            assert_eq!(mode, ComparisonMode::GreaterThan, "input {}", raw);
        }
        for raw in ["\"Less Than\"", "\"<\"", "\"less_than\"", "0"] {
            let mode: ComparisonMode = serde_json::from_str(raw).unwrap();
            assert_eq!(mode, ComparisonMode::LessThan, "input {}", raw);
        }
        assert!(serde_json::from_str::<ComparisonMode>("2").is_err());
        assert!(serde_json::from_str::<ComparisonMode>("\"equal\"").is_err());
    }

    #[test]
    fn test_comparison_mode_is_inclusive() {
        assert!(ComparisonMode::GreaterThan.is_met(100.0, 100.0));
        assert!(ComparisonMode::GreaterThan.is_met(100.5, 100.0));
        assert!(!ComparisonMode::GreaterThan.is_met(99.9, 100.0));
        assert!(ComparisonMode::LessThan.is_met(100.0, 100.0));
        assert!(!ComparisonMode::LessThan.is_met(100.1, 100.0));
    }

    #[test]
    fn test_option_type_parse() {
        assert_eq!("CALL".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("put".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }
}
