pub mod draft;
pub mod error;
pub mod models;
pub mod risk;

pub use draft::PortfolioDraft;
pub use error::PortfolioError;
pub use models::*;
pub use risk::PortfolioRiskService;
