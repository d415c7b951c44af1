//! European option pricing (Black-Scholes) and call/put price heatmaps.

pub mod black_scholes;
pub mod heatmap;

pub use black_scholes::{black_scholes, price_pair, OptionQuote};
pub use heatmap::{generate_heatmaps, HeatmapParams, OptionHeatmaps};
