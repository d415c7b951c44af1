use analysis_core::MarketDataProvider;
use notification_service::{Notification, NotificationService};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{AlertError, AlertManager, AlertRunSummary, PriceAlert};

/// Checks active alerts against live prices, notifies owners and retires met alerts.
#[derive(Clone)]
pub struct AlertMonitor {
    manager: AlertManager,
    provider: Arc<dyn MarketDataProvider>,
    notifier: NotificationService,
}

impl AlertMonitor {
    pub fn new(
        manager: AlertManager,
        provider: Arc<dyn MarketDataProvider>,
        notifier: NotificationService,
    ) -> Self {
        Self {
            manager,
            provider,
            notifier,
        }
    }

    pub async fn process_alerts(&self) -> Result<AlertRunSummary, AlertError> {
        let alerts = self.manager.active_alerts().await?;
        let mut summary = AlertRunSummary::default();
        // One quote per symbol per run
        let mut prices: HashMap<String, Option<f64>> = HashMap::new();

        for alert in alerts {
            let price = match prices.get(&alert.stock_symbol) {
                Some(cached) => *cached,
                None => {
                    let fetched = match self.provider.latest_price(&alert.stock_symbol).await {
                        Ok(p) => Some(p),
                        Err(e) => {
                            tracing::warn!("Error fetching price for {}: {}", alert.stock_symbol, e);
                            None
                        }
                    };
                    prices.insert(alert.stock_symbol.clone(), fetched);
                    fetched
                }
            };

            let Some(price) = price else {
                summary.skipped += 1;
                continue;
            };
            let Some(threshold) = alert.price_point.to_f64() else {
                tracing::warn!("Alert {} has an unusable price point {}", alert.alert_id, alert.price_point);
                summary.skipped += 1;
                continue;
            };

            summary.checked += 1;
            if !alert.comparison_mode.is_met(price, threshold) {
                continue;
            }

            if !self.manager.mark_triggered(&alert.alert_id, price).await? {
                tracing::debug!("Alert {} was already triggered", alert.alert_id);
                continue;
            }

            self.notify(&alert, price, threshold).await;
            summary.triggered += 1;
            summary.triggered_alert_ids.push(alert.alert_id);
        }

        tracing::info!(
            "Alert run: {} checked, {} triggered, {} skipped",
            summary.checked,
            summary.triggered,
            summary.skipped
        );
        Ok(summary)
    }

    async fn notify(&self, alert: &PriceAlert, price: f64, threshold: f64) {
        let notification = Notification::price_threshold(
            &alert.stock_symbol,
            price,
            threshold,
            alert.comparison_mode.direction(),
            alert.email.clone(),
        );

        let delivered = self.notifier.send_alert_async(&notification).await;
        if delivered == 0 {
            tracing::warn!(
                "Alert {} for {} triggered at {:.2} but no notification was delivered",
                alert.alert_id,
                alert.stock_symbol,
                price
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlertDb, AlertInput, AlertStatus};
    use analysis_core::{AnalysisError, Bar, ComparisonMode, TimeFrame};
    use async_trait::async_trait;
    use notification_service::{NotificationChannel, NotificationError};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedPrices {
        prices: HashMap<&'static str, f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for FixedPrices {
        async fn daily_bars(&self, symbol: &str, _tf: TimeFrame) -> Result<Vec<Bar>, AnalysisError> {
            Err(AnalysisError::NotFound(symbol.to_string()))
        }

        async fn latest_price(&self, symbol: &str) -> Result<f64, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| AnalysisError::NotFound(symbol.to_string()))
        }
    }

    struct Inbox(Arc<Mutex<Vec<Notification>>>);

    #[async_trait]
    impl NotificationChannel for Inbox {
        async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "inbox"
        }
    }

    fn alert(symbol: &str, price: i64, mode: ComparisonMode) -> AlertInput {
        AlertInput {
            email: format!("{}@alerts.example.com", symbol.to_lowercase()),
            stock_symbol: symbol.to_string(),
            price_point: Decimal::from(price),
            comparison_mode: mode,
        }
    }

    #[tokio::test]
    async fn test_process_alerts_triggers_met_alerts_once() {
        let manager = AlertManager::new(AlertDb::new("sqlite::memory:").await.unwrap());
        let above = manager.create_alert(&alert("AAPL", 200, ComparisonMode::GreaterThan), 190.0).await.unwrap();
        let exact = manager.create_alert(&alert("AAPL", 205, ComparisonMode::LessThan), 190.0).await.unwrap();
        let waiting = manager.create_alert(&alert("TSLA", 100, ComparisonMode::LessThan), 150.0).await.unwrap();
        manager.create_alert(&alert("ZZZZ", 10, ComparisonMode::GreaterThan), 11.0).await.unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAPL", 205.0);
        prices.insert("TSLA", 150.0);
        let provider = Arc::new(FixedPrices { prices, calls: AtomicUsize::new(0) });

        let inbox = Arc::new(Mutex::new(Vec::new()));
        let notifier = NotificationService::with_channels(vec![Box::new(Inbox(inbox.clone()))]);
        let monitor = AlertMonitor::new(manager.clone(), provider.clone(), notifier);

        let summary = monitor.process_alerts().await.unwrap();
        assert_eq!(summary.checked, 3);
        assert_eq!(summary.triggered, 2);
        assert_eq!(summary.skipped, 1);
        assert!(summary.triggered_alert_ids.contains(&above.alert_id));
        assert!(summary.triggered_alert_ids.contains(&exact.alert_id));
        // AAPL quoted once for both of its alerts
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);

        {
            let sent = inbox.lock().unwrap();
            assert_eq!(sent.len(), 2);
            assert!(sent.iter().all(|n| n.title == "Stock Alert Triggered: AAPL"));
            assert!(sent.iter().all(|n| n.recipient.as_deref() == Some("aapl@alerts.example.com")));
        }

        assert_eq!(
            manager.get_alert(&above.alert_id).await.unwrap().alert_status,
            AlertStatus::Triggered
        );
        assert_eq!(
            manager.get_alert(&waiting.alert_id).await.unwrap().alert_status,
            AlertStatus::Active
        );

        let second = monitor.process_alerts().await.unwrap();
        assert_eq!(second.triggered, 0);
        assert_eq!(inbox.lock().unwrap().len(), 2);
    }
}
