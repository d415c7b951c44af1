//! Return, volatility, correlation and portfolio risk calculations on daily price series.

pub mod correlation;
pub mod portfolio;
pub mod returns;
pub mod snapshot;
pub mod volatility;

pub use correlation::{align_closes, correlation_matrix, AlignedCloses};
pub use portfolio::{calculate_portfolio_metrics, Holding, PortfolioMetrics, StockDetail};
pub use returns::{log_returns, simple_returns};
pub use snapshot::price_snapshot;
pub use volatility::annualized_volatility;

/// Trading days used to annualise daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
