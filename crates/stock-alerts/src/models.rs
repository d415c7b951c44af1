use analysis_core::ComparisonMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AlertError;

/// Request to watch a stock for a price threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertInput {
    pub email: String,
    pub stock_symbol: String,
    pub price_point: Decimal,
    pub comparison_mode: ComparisonMode,
}

impl AlertInput {
    /// Trimmed, upper-cased copy of the input, or `Validation("Invalid input data.")`.
    pub fn validated(&self) -> Result<AlertInput, AlertError> {
        let email = self.email.trim();
        let stock_symbol = self.stock_symbol.trim().to_uppercase();

        if !is_valid_email(email) || stock_symbol.is_empty() || self.price_point <= Decimal::ZERO {
            return Err(AlertError::invalid_input());
        }

        Ok(AlertInput {
            email: email.to_string(),
            stock_symbol,
            price_point: self.price_point,
            comparison_mode: self.comparison_mode,
        })
    }
}

/// `local@domain.tld` shape: something before the first `@`, then a dot with
/// text on both sides before any further `@`. Anything may follow.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, rest)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    let domain = rest.split('@').next().unwrap_or_default();
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Triggered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Triggered => "triggered",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlertStatus::Active),
            "triggered" => Ok(AlertStatus::Triggered),
            other => Err(format!("unknown alert status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub alert_id: String,
    pub email: String,
    pub stock_symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_point: Decimal,
    pub comparison_mode: ComparisonMode,
    pub alert_status: AlertStatus,
    /// Price when the alert was created.
    pub current_price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub trigger_price: Option<f64>,
}

/// Row as stored in SQLite; decimals, enums and timestamps are text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AlertRow {
    pub alert_id: String,
    pub email: String,
    pub stock_symbol: String,
    pub price_point: String,
    pub comparison_mode: String,
    pub alert_status: String,
    pub current_price: Option<f64>,
    pub created_at: String,
    pub triggered_at: Option<String>,
    pub trigger_price: Option<f64>,
}

impl TryFrom<AlertRow> for PriceAlert {
    type Error = AlertError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| AlertError::Corrupt {
            id: row.alert_id.clone(),
            reason,
        };
        let parse_time = |raw: &str| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("bad timestamp '{}': {}", raw, e)))
        };

        let price_point = Decimal::from_str(&row.price_point)
            .map_err(|e| corrupt(format!("bad price point '{}': {}", row.price_point, e)))?;
        let comparison_mode = ComparisonMode::from_str(&row.comparison_mode)
            .map_err(|e| corrupt(e.to_string()))?;
        let alert_status = AlertStatus::from_str(&row.alert_status).map_err(corrupt)?;
        let created_at = parse_time(&row.created_at)?;
        let triggered_at = row.triggered_at.as_deref().map(parse_time).transpose()?;

        Ok(PriceAlert {
            alert_id: row.alert_id,
            email: row.email,
            stock_symbol: row.stock_symbol,
            price_point,
            comparison_mode,
            alert_status,
            current_price: row.current_price,
            created_at,
            triggered_at,
            trigger_price: row.trigger_price,
        })
    }
}

/// Outcome of one pass over the active alerts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRunSummary {
    /// Alerts evaluated against a live price.
    pub checked: usize,
    pub triggered: usize,
    /// Alerts left untouched because their price could not be fetched.
    pub skipped: usize,
    pub triggered_alert_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(email: &str, symbol: &str, price: Decimal) -> AlertInput {
        AlertInput {
            email: email.to_string(),
            stock_symbol: symbol.to_string(),
            price_point: price,
            comparison_mode: ComparisonMode::GreaterThan,
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@mail.example.co.uk"));
        assert!(is_valid_email("a@b.c@trailing"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@example."));
    }

    #[test]
    fn test_validated_normalizes() {
        let ok = input(" me@site.io ", " tsla ", dec!(250.5)).validated().unwrap();
        assert_eq!(ok.email, "me@site.io");
        assert_eq!(ok.stock_symbol, "TSLA");
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        for bad in [
            input("nope", "AAPL", dec!(10)),
            input("me@site.io", "  ", dec!(10)),
            input("me@site.io", "AAPL", dec!(0)),
            input("me@site.io", "AAPL", dec!(-5)),
        ] {
            let err = bad.validated().unwrap_err();
            assert_eq!(err.to_string(), "Invalid input data.");
        }
    }

    #[test]
    fn test_input_accepts_numeric_json() {
        let parsed: AlertInput = serde_json::from_str(
            r#"{"email":"a@b.co","stock_symbol":"ibm","price_point":123.45,"comparison_mode":0}"#,
        )
        .unwrap();
        assert_eq!(parsed.price_point, dec!(123.45));
        assert_eq!(parsed.comparison_mode, ComparisonMode::LessThan);
    }
}
