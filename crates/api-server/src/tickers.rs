/// Stocks offered by the ticker autocomplete.
pub const STOCK_TICKERS: [&str; 20] = [
    "AAPL", "TSLA", "GOOGL", "AMZN", "MSFT", "META", "NFLX", "NVDA", "SPY", "VTI", "MSCI", "BA",
    "GE", "INTC", "IBM", "DIS", "GS", "WMT", "JPM", "BABA",
];

pub const CRYPTO_SYMBOLS: [&str; 7] = ["BTC", "ETH", "XRP", "LTC", "DOGE", "ADA", "SOL"];

/// Tickers starting with the upper-cased `prefix`, in list order. A blank prefix suggests nothing.
pub fn suggest(prefix: &str) -> Vec<&'static str> {
    let prefix = prefix.trim().to_uppercase();
    if prefix.is_empty() {
        return Vec::new();
    }
    STOCK_TICKERS
        .iter()
        .copied()
        .filter(|ticker| ticker.starts_with(&prefix))
        .collect()
}
