use quant_analysis::PortfolioMetrics;
use serde::{Deserialize, Serialize};

/// One row of the portfolio form: ticker and share count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    #[serde(default)]
    pub stock: String,
    #[serde(default)]
    pub shares: f64,
}

impl PortfolioEntry {
    pub fn new(stock: impl Into<String>, shares: f64) -> Self {
        Self {
            stock: stock.into(),
            shares,
        }
    }

    /// Upper-cased ticker when the entry can be priced: non-blank ticker and positive shares.
    pub fn normalized(&self) -> Option<PortfolioEntry> {
        let stock = self.stock.trim().to_uppercase();
        if stock.is_empty() || !self.shares.is_finite() || self.shares <= 0.0 {
            return None;
        }
        Some(PortfolioEntry {
            stock,
            shares: self.shares,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    #[serde(flatten)]
    pub metrics: PortfolioMetrics,
    pub analysis_period: String,
    pub last_updated: String,
}
