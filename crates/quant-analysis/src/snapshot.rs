use analysis_core::{AnalysisError, PriceSnapshot};

use crate::annualized_volatility;

/// Current price, 24h change, period return and annualised volatility from daily closes
/// (oldest first). Percentages throughout, as shown on the crypto and stock pages.
pub fn price_snapshot(closes: &[f64]) -> Result<PriceSnapshot, AnalysisError> {
    if closes.len() < 2 {
        return Err(AnalysisError::InsufficientData(
            "Not enough data to calculate statistics".to_string(),
        ));
    }

    let current_price = closes[closes.len() - 1];
    let previous_price = closes[closes.len() - 2];
    let start_price = closes[0];

    if previous_price <= 0.0 || start_price <= 0.0 {
        return Err(AnalysisError::InvalidData(
            "Price history contains non-positive prices".to_string(),
        ));
    }

    // Two closes give a single return; report zero volatility rather than failing.
    let volatility = if closes.len() < 3 {
        0.0
    } else {
        annualized_volatility(closes)?
    };

    Ok(PriceSnapshot {
        current_price,
        price_change_24h: (current_price - previous_price) / previous_price * 100.0,
        annual_return: (current_price - start_price) / start_price * 100.0,
        volatility: volatility * 100.0,
    })
}
