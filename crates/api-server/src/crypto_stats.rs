use analysis_core::{AnalysisError, CryptoDataProvider, TimeFrame};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Days of history for a `period` query value: a positive day count or one of `6mo`, `1y`, `5y`.
pub fn period_days(period: &str) -> Result<u32, AnalysisError> {
    let period = period.trim();
    if let Ok(days) = period.parse::<u32>() {
        if days == 0 {
            return Err(AnalysisError::InvalidData("Period must be at least one day".to_string()));
        }
        return Ok(days);
    }
    period.parse::<TimeFrame>().map(|tf| tf.lookback_days())
}

/// Where crypto statistics come from.
#[async_trait]
pub trait CryptoStatsSource: Send + Sync {
    /// Statistics for `symbol` over the last `days` days, as the JSON object returned to clients.
    async fn fetch(&self, symbol: &str, days: u32) -> Result<serde_json::Value>;
    fn name(&self) -> &str;
}

/// Computes statistics in-process from daily history.
pub struct NativeCryptoStats {
    provider: Arc<dyn CryptoDataProvider>,
}

impl NativeCryptoStats {
    pub fn new(provider: Arc<dyn CryptoDataProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CryptoStatsSource for NativeCryptoStats {
    async fn fetch(&self, symbol: &str, days: u32) -> Result<serde_json::Value> {
        let bars = self.provider.daily_bars(symbol, days).await?;
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let snapshot = quant_analysis::price_snapshot(&closes)?;
        Ok(serde_json::to_value(snapshot)?)
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Runs an external statistics script as `<python> <script> <symbol> <days>` and
/// parses the first line it prints as JSON.
pub struct ScriptCryptoStats {
    python_path: String,
    script_path: String,
    timeout: Duration,
}

impl ScriptCryptoStats {
    pub fn new(python_path: impl Into<String>, script_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            python_path: python_path.into(),
            script_path: script_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CryptoStatsSource for ScriptCryptoStats {
    async fn fetch(&self, symbol: &str, days: u32) -> Result<serde_json::Value> {
        let child = Command::new(&self.python_path)
            .arg(&self.script_path)
            .arg(symbol)
            .arg(days.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {} {}", self.python_path, self.script_path))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("Statistics script timed out after {:?}", self.timeout))?
            .context("Failed to read statistics script output")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "Statistics script exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let first_line = stdout
            .lines()
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| anyhow!("Statistics script produced no output"))?;

        serde_json::from_str(first_line).context("Statistics script output is not JSON")
    }

    fn name(&self) -> &str {
        "script"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::Bar;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    struct StaticCrypto;

    #[async_trait]
    impl CryptoDataProvider for StaticCrypto {
        async fn daily_bars(&self, symbol: &str, days: u32) -> Result<Vec<Bar>, AnalysisError> {
            if symbol != "BTC" {
                return Err(AnalysisError::ApiError(format!("Error fetching data for {}", symbol)));
            }
            let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            Ok((0..days.min(3))
                .map(|i| {
                    let close = [40_000.0, 42_000.0, 42_840.0][i as usize];
                    Bar {
                        timestamp: start + ChronoDuration::days(i as i64),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 0.0,
                    }
                })
                .collect())
        }
    }

    #[test]
    fn test_period_days() {
        assert_eq!(period_days("365").unwrap(), 365);
        assert_eq!(period_days("6mo").unwrap(), 182);
        assert_eq!(period_days("5Y").unwrap(), 1825);
        assert!(period_days("0").is_err());
        assert!(period_days("forever").is_err());
    }

    #[tokio::test]
    async fn test_native_source_returns_snapshot_json() {
        let source = NativeCryptoStats::new(Arc::new(StaticCrypto));
        let stats = source.fetch("BTC", 30).await.unwrap();
        assert_eq!(stats["current_price"], 42_840.0);
        assert!((stats["price_change_24h"].as_f64().unwrap() - 2.0).abs() < 1e-9);
        assert!((stats["annual_return"].as_f64().unwrap() - 7.1).abs() < 1e-9);
        assert!(stats.get("volatility").is_some());

        assert!(source.fetch("NOPE", 30).await.is_err());
    }

    #[tokio::test]
    async fn test_native_source_needs_two_closes() {
        let source = NativeCryptoStats::new(Arc::new(StaticCrypto));
        let err = source.fetch("BTC", 1).await.unwrap_err();
        assert!(err.to_string().contains("Not enough data"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_source_parses_first_line() {
        // printf repeats the format once per extra argument: one JSON object per line
        let source = ScriptCryptoStats::new("printf", "{\"arg\":\"%s\"}\\n", Duration::from_secs(5));
        let value = source.fetch("ETH", 30).await.unwrap();
        assert_eq!(value, serde_json::json!({ "arg": "ETH" }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_script_source_failures() {
        let failing = ScriptCryptoStats::new("false", "stats.py", Duration::from_secs(5));
        assert!(failing.fetch("BTC", 365).await.is_err());

        let missing = ScriptCryptoStats::new("/nonexistent/python3", "stats.py", Duration::from_secs(5));
        assert!(missing.fetch("BTC", 365).await.is_err());
    }
}
