use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("{0}")]
    Validation(String),

    #[error("Alert not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored alert {id} is unreadable: {reason}")]
    Corrupt { id: String, reason: String },

    #[error(transparent)]
    MarketData(#[from] AnalysisError),
}

impl AlertError {
    pub fn invalid_input() -> Self {
        AlertError::Validation("Invalid input data.".to_string())
    }
}
