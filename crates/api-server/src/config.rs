use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

/// Server settings, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Annual decimal used for Sharpe ratios when a request gives none.
    pub risk_free_rate: f64,
    /// Seconds between background alert runs; 0 disables the loop.
    pub alert_check_interval_secs: u64,
    pub volatility_cache_ttl_secs: u64,
    pub crypto_cache_ttl_secs: u64,
    pub price_cache_ttl_secs: u64,
    /// When set, crypto statistics come from this script instead of the native calculation.
    pub crypto_stats_script: Option<String>,
    pub python_path: String,
    pub script_timeout_secs: u64,
    pub cryptocompare_api_key: Option<String>,
    pub yahoo_base_url: Option<String>,
    pub cryptocompare_base_url: Option<String>,
    /// Allowed origins; empty means any.
    pub cors_origins: Vec<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("API_PORT must be a port number")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:cosine.db".to_string()),
            risk_free_rate: env::var("RISK_FREE_RATE")
                .unwrap_or_else(|_| "0.05".to_string())
                .parse()
                .context("RISK_FREE_RATE must be a decimal rate")?,
            alert_check_interval_secs: env::var("ALERT_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .context("ALERT_CHECK_INTERVAL_SECS must be a number of seconds")?,
            volatility_cache_ttl_secs: env::var("VOLATILITY_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("VOLATILITY_CACHE_TTL_SECS must be a number of seconds")?,
            crypto_cache_ttl_secs: env::var("CRYPTO_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("CRYPTO_CACHE_TTL_SECS must be a number of seconds")?,
            price_cache_ttl_secs: env::var("PRICE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("PRICE_CACHE_TTL_SECS must be a number of seconds")?,
            crypto_stats_script: optional("CRYPTO_STATS_SCRIPT"),
            python_path: env::var("PYTHON_PATH").unwrap_or_else(|_| "python3".to_string()),
            script_timeout_secs: env::var("SCRIPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SCRIPT_TIMEOUT_SECS must be a number of seconds")?,
            cryptocompare_api_key: optional("CRYPTOCOMPARE_API_KEY"),
            yahoo_base_url: optional("YAHOO_BASE_URL"),
            cryptocompare_base_url: optional("CRYPTOCOMPARE_BASE_URL"),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "*")
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            anyhow::bail!("RISK_FREE_RATE must be finite");
        }
        if self.script_timeout_secs == 0 {
            anyhow::bail!("SCRIPT_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "sqlite:cosine.db".to_string(),
            risk_free_rate: 0.05,
            alert_check_interval_secs: 300,
            volatility_cache_ttl_secs: 3600,
            crypto_cache_ttl_secs: 86400,
            price_cache_ttl_secs: 3600,
            crypto_stats_script: None,
            python_path: "python3".to_string(),
            script_timeout_secs: 30,
            cryptocompare_api_key: None,
            yahoo_base_url: None,
            cryptocompare_base_url: None,
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_invalid_host_is_reported() {
        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
