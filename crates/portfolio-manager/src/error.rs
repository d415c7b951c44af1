use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Please enter at least one valid stock with shares.")]
    NoValidEntries,

    #[error("Portfolio entry {index} does not exist ({len} entries)")]
    EntryNotFound { index: usize, len: usize },

    #[error("Shares must be a non-negative number, got {0}")]
    InvalidShares(f64),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PortfolioError {
    /// Errors caused by the caller's input rather than by market data or computation.
    pub fn is_client_error(&self) -> bool {
        match self {
            PortfolioError::NoValidEntries | PortfolioError::InvalidShares(_) => true,
            PortfolioError::EntryNotFound { .. } => false,
            PortfolioError::Analysis(e) => e.is_client_error(),
        }
    }
}
