use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AnalysisError {
    /// True for errors caused by the caller's input rather than by an upstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidData(_) | AnalysisError::InsufficientData(_)
        )
    }
}
