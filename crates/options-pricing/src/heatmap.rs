use analysis_core::AnalysisError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::black_scholes::{price_pair, quote_with, standard_normal};

const MAX_STEPS: usize = 100;

/// Grid bounds for the spot x volatility heatmaps. Missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapParams {
    pub strike: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub min_spot: f64,
    pub max_spot: f64,
    pub min_volatility: f64,
    pub max_volatility: f64,
    pub steps: usize,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            strike: 110.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            min_spot: 50.0,
            max_spot: 150.0,
            min_volatility: 0.1,
            max_volatility: 0.5,
            steps: 10,
        }
    }
}

/// Call and put prices indexed `[spot_index][volatility_index]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionHeatmaps {
    pub spot_prices: Vec<f64>,
    pub volatilities: Vec<f64>,
    pub spot_labels: Vec<String>,
    pub volatility_labels: Vec<String>,
    pub call_prices: Vec<Vec<f64>>,
    pub put_prices: Vec<Vec<f64>>,
}

/// `steps` evenly spaced values from `start` to `end`, both ends included.
fn linspace(start: f64, end: f64, steps: usize) -> Vec<f64> {
    if steps == 1 {
        return vec![start];
    }
    let step = (end - start) / (steps - 1) as f64;
    (0..steps)
        .map(|i| if i == steps - 1 { end } else { start + step * i as f64 })
        .collect()
}

fn check_range(name: &str, min: f64, max: f64) -> Result<(), AnalysisError> {
    if !min.is_finite() || !max.is_finite() || min <= 0.0 {
        return Err(AnalysisError::InvalidData(format!(
            "{} bounds must be positive numbers",
            name
        )));
    }
    if min > max {
        return Err(AnalysisError::InvalidData(format!(
            "Minimum {} ({}) exceeds maximum ({})",
            name.to_lowercase(),
            min,
            max
        )));
    }
    Ok(())
}

pub fn generate_heatmaps(params: &HeatmapParams) -> Result<OptionHeatmaps, AnalysisError> {
    if params.steps < 2 || params.steps > MAX_STEPS {
        return Err(AnalysisError::InvalidData(format!(
            "Heatmap steps must be between 2 and {}, got {}",
            MAX_STEPS, params.steps
        )));
    }
    check_range("Spot", params.min_spot, params.max_spot)?;
    check_range("Volatility", params.min_volatility, params.max_volatility)?;

    // Validates strike, maturity and rate once for the whole grid
    price_pair(
        params.min_spot,
        params.strike,
        params.time_to_maturity,
        params.risk_free_rate,
        params.min_volatility,
    )?;

    let normal = standard_normal()?;
    let spot_prices = linspace(params.min_spot, params.max_spot, params.steps);
    let volatilities = linspace(params.min_volatility, params.max_volatility, params.steps);

    let rows: Vec<(Vec<f64>, Vec<f64>)> = spot_prices
        .par_iter()
        .map(|&spot| {
            volatilities
                .iter()
                .map(|&vol| {
                    let q = quote_with(
                        &normal,
                        spot,
                        params.strike,
                        params.time_to_maturity,
                        params.risk_free_rate,
                        vol,
                    );
                    (q.call, q.put)
                })
                .unzip()
        })
        .collect();
    let (call_prices, put_prices): (Vec<Vec<f64>>, Vec<Vec<f64>>) = rows.into_iter().unzip();

    tracing::debug!(
        "Generated {}x{} option heatmaps for K={}",
        spot_prices.len(),
        volatilities.len(),
        params.strike
    );

    Ok(OptionHeatmaps {
        spot_labels: spot_prices.iter().map(|s| format!("S={:.2}", s)).collect(),
        volatility_labels: volatilities.iter().map(|v| format!("σ={:.2}", v)).collect(),
        spot_prices,
        volatilities,
        call_prices,
        put_prices,
    })
}
