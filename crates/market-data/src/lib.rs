use analysis_core::AnalysisError;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod cryptocompare;
pub mod yahoo;

pub use cryptocompare::CryptoCompareClient;
pub use yahoo::YahooFinanceClient;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_ATTEMPTS: u32 = 3;
const RETRY_WAIT_SECS: u64 = 5;

const LIMITER_SLACK: Duration = Duration::from_millis(50);

/// At most `max_requests` requests in any `window`.
#[derive(Clone)]
pub(crate) struct RateLimiter {
    sent: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            sent: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Wait for a free slot and claim it.
    pub(crate) async fn acquire(&self) {
        loop {
            let wait = {
                let mut sent = self.sent.lock().await;
                let now = Instant::now();
                while sent.front().is_some_and(|&t| now.duration_since(t) >= self.window) {
                    sent.pop_front();
                }
                if sent.len() < self.max_requests {
                    sent.push_back(now);
                    return;
                }
                sent.front().map_or(LIMITER_SLACK, |&oldest| {
                    (oldest + self.window).saturating_duration_since(now) + LIMITER_SLACK
                })
            };
            tracing::debug!("Market data rate limit reached, retrying in {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

/// HTTP client shared by the market data providers: one rate limit, one retry policy.
#[derive(Clone)]
pub(crate) struct ApiTransport {
    client: Client,
    rate_limiter: RateLimiter,
    provider: &'static str,
}

impl ApiTransport {
    pub(crate) fn new(provider: &'static str) -> Self {
        let rate_limit: usize = std::env::var("MARKET_DATA_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(120);

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("Mozilla/5.0 (compatible; cosine/0.1)")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            provider,
        }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request with rate limiting and automatic 429 retry, returning the JSON body.
    pub(crate) async fn get_json(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, AnalysisError> {
        let request = builder.build().map_err(|e| AnalysisError::ApiError(e.to_string()))?;

        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| AnalysisError::ApiError(format!("{} request failed: {}", self.provider, e)))?;

            let status = response.status();
            if status.as_u16() == 429 {
                tracing::warn!(
                    "{} rate limited, waiting {}s before retry {}/{}",
                    self.provider,
                    RETRY_WAIT_SECS,
                    attempt + 1,
                    MAX_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RETRY_WAIT_SECS)).await;
                continue;
            }

            if status.as_u16() == 404 {
                return Err(AnalysisError::NotFound(format!(
                    "{} returned 404 for {}",
                    self.provider,
                    request.url().path()
                )));
            }

            // Yahoo reports unknown symbols with a 4xx status and a JSON error body,
            // so non-success bodies are still handed to the caller's parser when they decode.
            let body = response.text().await.map_err(|e| AnalysisError::ApiError(e.to_string()))?;
            return match serde_json::from_str(&body) {
                Ok(value) => Ok(value),
                Err(_) if !status.is_success() => Err(AnalysisError::ApiError(format!(
                    "{} HTTP {}: {}",
                    self.provider, status, body
                ))),
                Err(e) => Err(AnalysisError::ApiError(format!(
                    "{} returned malformed JSON: {}",
                    self.provider, e
                ))),
            };
        }

        Err(AnalysisError::ApiError(format!(
            "Rate limited by {} after {} retries",
            self.provider, MAX_ATTEMPTS
        )))
    }
}
