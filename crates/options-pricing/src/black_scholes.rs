use analysis_core::{AnalysisError, OptionType};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Call and put prices for the same contract parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub call: f64,
    pub put: f64,
}

pub(crate) fn standard_normal() -> Result<Normal, AnalysisError> {
    Normal::new(0.0, 1.0).map_err(|e| AnalysisError::CalculationError(e.to_string()))
}

fn validate(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
) -> Result<(), AnalysisError> {
    let positive = [
        ("Spot price", spot),
        ("Strike price", strike),
        ("Time to maturity", time_to_maturity),
        ("Volatility", volatility),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            return Err(AnalysisError::InvalidData(format!(
                "{} must be a positive number, got {}",
                name, value
            )));
        }
    }
    if !risk_free_rate.is_finite() {
        return Err(AnalysisError::InvalidData(
            "Risk-free rate must be a finite number".to_string(),
        ));
    }
    Ok(())
}

/// Price both legs with an already constructed N(0,1). Inputs must be validated.
pub(crate) fn quote_with(
    normal: &Normal,
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
) -> OptionQuote {
    let sqrt_t = time_to_maturity.sqrt();
    let d1 = ((spot / strike).ln() + (risk_free_rate + 0.5 * volatility * volatility) * time_to_maturity)
        / (volatility * sqrt_t);
    let d2 = d1 - volatility * sqrt_t;
    let discounted_strike = strike * (-risk_free_rate * time_to_maturity).exp();

    OptionQuote {
        call: spot * normal.cdf(d1) - discounted_strike * normal.cdf(d2),
        put: discounted_strike * normal.cdf(-d2) - spot * normal.cdf(-d1),
    }
}

/// Black-Scholes call and put prices of a European option.
///
/// `time_to_maturity` is in years; `risk_free_rate` and `volatility` are annual decimals.
pub fn price_pair(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
) -> Result<OptionQuote, AnalysisError> {
    validate(spot, strike, time_to_maturity, risk_free_rate, volatility)?;
    let normal = standard_normal()?;
    Ok(quote_with(&normal, spot, strike, time_to_maturity, risk_free_rate, volatility))
}

/// Black-Scholes price of a single European call or put.
pub fn black_scholes(
    spot: f64,
    strike: f64,
    time_to_maturity: f64,
    risk_free_rate: f64,
    volatility: f64,
    option_type: OptionType,
) -> Result<f64, AnalysisError> {
    let quote = price_pair(spot, strike, time_to_maturity, risk_free_rate, volatility)?;
    Ok(match option_type {
        OptionType::Call => quote.call,
        OptionType::Put => quote.put,
    })
}
