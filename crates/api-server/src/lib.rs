//! HTTP service for the Cosine investment assistant.

pub mod alert_routes;
pub mod cache;
pub mod config;
pub mod crypto_routes;
pub mod crypto_stats;
pub mod options_routes;
pub mod portfolio_routes;
pub mod preference_routes;
pub mod preferences;
pub mod request_id;
pub mod security_headers;
pub mod stock_routes;
pub mod symbol_routes;
pub mod tickers;

use analysis_core::{AnalysisError, MarketDataProvider, PriceSnapshot};
use axum::{
    body::Bytes,
    http::{HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use market_data::{CryptoCompareClient, YahooFinanceClient};
use notification_service::{NotificationConfig, NotificationService};
use portfolio_manager::{PortfolioDraft, PortfolioError, PortfolioRiskService};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use stock_alerts::{AlertDb, AlertError, AlertManager, AlertMonitor};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cache::TtlCache;
use config::ServerConfig;
use crypto_stats::{CryptoStatsSource, NativeCryptoStats, ScriptCryptoStats};
use preferences::Preferences;

/// JSON envelope used by every `/api` route except `/api/crypto-stats`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with. Anything convertible to
/// `anyhow::Error` becomes a 500 through `?`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
        }
        (self.status, Json(ApiResponse::failure(self.error.to_string()))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

/// Parse an optional JSON body. An empty body means "use defaults"; anything
/// else must deserialize cleanly.
pub(crate) fn json_or_default<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("Invalid request body: {}", e)))
}

pub(crate) fn analysis_error(err: AnalysisError) -> AppError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, AnalysisError::NotFound(_)) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    AppError::with_status(status, err.into())
}

pub(crate) fn portfolio_error(err: PortfolioError) -> AppError {
    if err.is_client_error() {
        return AppError::with_status(StatusCode::BAD_REQUEST, err.into());
    }
    match err {
        PortfolioError::Analysis(e) => analysis_error(e),
        PortfolioError::EntryNotFound { .. } => AppError::with_status(StatusCode::NOT_FOUND, err.into()),
        other => other.into(),
    }
}

pub(crate) fn alert_error(err: AlertError) -> AppError {
    match err {
        AlertError::Validation(_) => AppError::with_status(StatusCode::BAD_REQUEST, err.into()),
        AlertError::NotFound(_) => AppError::with_status(StatusCode::NOT_FOUND, err.into()),
        AlertError::MarketData(e) => analysis_error(e),
        AlertError::Database(_) | AlertError::Corrupt { .. } => err.into(),
    }
}

/// Response caches, one per kind of upstream data.
pub struct AppCaches {
    pub volatility: TtlCache<PriceSnapshot>,
    pub crypto_stats: TtlCache<serde_json::Value>,
    pub prices: TtlCache<f64>,
}

impl AppCaches {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            volatility: TtlCache::new(config.volatility_cache_ttl_secs),
            crypto_stats: TtlCache::new(config.crypto_cache_ttl_secs),
            prices: TtlCache::new(config.price_cache_ttl_secs),
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.volatility.purge_expired() + self.crypto_stats.purge_expired() + self.prices.purge_expired()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub market: Arc<dyn MarketDataProvider>,
    pub crypto_stats: Arc<dyn CryptoStatsSource>,
    pub portfolio_risk: PortfolioRiskService,
    pub draft: Arc<RwLock<PortfolioDraft>>,
    pub alerts: AlertManager,
    pub alert_monitor: AlertMonitor,
    pub preferences: Preferences,
    pub caches: Arc<AppCaches>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        market: Arc<dyn MarketDataProvider>,
        crypto_stats: Arc<dyn CryptoStatsSource>,
        alert_db: AlertDb,
        notifier: NotificationService,
    ) -> Self {
        let alerts = AlertManager::new(alert_db);
        Self {
            caches: Arc::new(AppCaches::new(&config)),
            config: Arc::new(config),
            portfolio_risk: PortfolioRiskService::new(market.clone()),
            alert_monitor: AlertMonitor::new(alerts.clone(), market.clone(), notifier),
            alerts,
            market,
            crypto_stats,
            draft: Arc::new(RwLock::new(PortfolioDraft::new())),
            preferences: Preferences::default(),
        }
    }

    /// Latest stock price through the price cache.
    pub async fn latest_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
        let symbol = symbol.trim().to_uppercase();
        self.caches
            .prices
            .get_or_try_insert(&symbol, || self.market.latest_price(&symbol))
            .await
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Full application router with middleware, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .merge(crypto_routes::crypto_routes())
        .merge(stock_routes::stock_routes())
        .merge(symbol_routes::symbol_routes())
        .merge(portfolio_routes::portfolio_routes())
        .merge(options_routes::options_routes())
        .merge(alert_routes::alert_routes())
        .merge(preference_routes::preference_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(request_id::request_id_middleware))
                .layer(middleware::from_fn(security_headers::security_headers_middleware)),
        )
        .with_state(state)
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));
}

/// Periodically evaluate active alerts until the process exits.
fn spawn_alert_loop(monitor: AlertMonitor, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("Background alert checks disabled");
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = monitor.process_alerts().await {
                tracing::error!("Alert check failed: {}", e);
            }
        }
    });
    tracing::info!("Checking price alerts every {}s", interval_secs);
}

/// Log every change of the shared time frame.
fn spawn_time_frame_watcher(preferences: &Preferences) {
    let mut changes = preferences.subscribe();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let time_frame = *changes.borrow_and_update();
            tracing::info!("Shared time frame is now {}", time_frame);
        }
    });
}

const CACHE_SWEEP_SECS: u64 = 600;

fn spawn_cache_sweeper(caches: Arc<AppCaches>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(CACHE_SWEEP_SECS));
        loop {
            ticker.tick().await;
            let removed = caches.purge_expired();
            if removed > 0 {
                tracing::debug!("Evicted {} expired cache entries", removed);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!("Starting Cosine API server");

    let market: Arc<dyn MarketDataProvider> = Arc::new(match &config.yahoo_base_url {
        Some(url) => YahooFinanceClient::with_base_url(url.clone()),
        None => YahooFinanceClient::new(),
    });

    let crypto_stats: Arc<dyn CryptoStatsSource> = match &config.crypto_stats_script {
        Some(script) => {
            tracing::info!("Crypto statistics from script {} ({})", script, config.python_path);
            Arc::new(ScriptCryptoStats::new(
                config.python_path.clone(),
                script.clone(),
                Duration::from_secs(config.script_timeout_secs),
            ))
        }
        None => {
            let api_key = config.cryptocompare_api_key.clone();
            let client = match &config.cryptocompare_base_url {
                Some(url) => CryptoCompareClient::with_base_url(url.clone(), api_key),
                None => CryptoCompareClient::new(api_key),
            };
            Arc::new(NativeCryptoStats::new(Arc::new(client)))
        }
    };

    let alert_db = AlertDb::new(&config.database_url).await?;
    let notifier = NotificationService::new(&NotificationConfig::from_env());
    let addr = config.socket_addr()?;
    let alert_interval = config.alert_check_interval_secs;

    let state = AppState::new(config, market, crypto_stats, alert_db, notifier);
    spawn_alert_loop(state.alert_monitor.clone(), alert_interval);
    spawn_cache_sweeper(state.caches.clone());
    spawn_time_frame_watcher(&state.preferences);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
