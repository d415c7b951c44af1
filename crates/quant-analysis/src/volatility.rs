use analysis_core::AnalysisError;
use statrs::statistics::Statistics;

use crate::{log_returns, TRADING_DAYS_PER_YEAR};

/// Annualised volatility (decimal, e.g. 0.25 = 25%): sample standard deviation of
/// daily log returns scaled by sqrt(252).
pub fn annualized_volatility(prices: &[f64]) -> Result<f64, AnalysisError> {
    let returns = log_returns(prices);
    if returns.len() < 2 {
        return Err(AnalysisError::InsufficientData(format!(
            "Need at least 3 prices to estimate volatility, got {}",
            prices.len()
        )));
    }

    let std_dev = returns.std_dev();
    if !std_dev.is_finite() {
        return Err(AnalysisError::CalculationError(
            "Volatility is not a finite number".to_string(),
        ));
    }

    Ok(std_dev * TRADING_DAYS_PER_YEAR.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_growth_has_zero_volatility() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let vol = annualized_volatility(&prices).unwrap();
        assert!(vol.abs() < 1e-10);
    }

    #[test]
    fn test_alternating_prices_match_hand_computation() {
        // log returns: +ln(1.1), -ln(1.1), +ln(1.1) -> sample std = ln(1.1) * sqrt(4/3)
        let prices = [100.0, 110.0, 100.0, 110.0];
        let expected = (1.1_f64).ln() * (4.0_f64 / 3.0).sqrt() * 252.0_f64.sqrt();
        let vol = annualized_volatility(&prices).unwrap();
        assert!((vol - expected).abs() < 1e-10);
    }

    #[test]
    fn test_too_few_prices() {
        assert!(matches!(
            annualized_volatility(&[100.0, 101.0]),
            Err(AnalysisError::InsufficientData(_))
        ));
    }
}
