mod config;
mod smtp;
mod templates;

pub use config::{NotificationConfig, SmtpSettings, TlsMode};
pub use smtp::SmtpNotifier;
pub use templates::EmailTemplate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Events that produce a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A stock crossed the threshold of a price alert.
    PriceThreshold {
        symbol: String,
        current_price: f64,
        threshold: f64,
        /// "above" or "below"
        condition: String,
    },
}

/// A notification to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Address of the user the notification is for. Channels without a
    /// per-user address ignore it.
    pub recipient: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        recipient: Option<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            recipient,
            timestamp: chrono::Utc::now(),
            title: title.into(),
            message: message.into(),
        }
    }

    /// "Stock Alert Triggered" notification addressed to the alert's owner.
    pub fn price_threshold(
        symbol: &str,
        current_price: f64,
        threshold: f64,
        condition: &str,
        recipient: impl Into<String>,
    ) -> Self {
        let symbol = symbol.to_uppercase();
        let message = format!(
            "The stock {} has reached your threshold. Current Price: ${:.2}, Threshold: ${:.2}",
            symbol, current_price, threshold
        );
        Self::new(
            NotificationKind::PriceThreshold {
                symbol: symbol.clone(),
                current_price,
                threshold,
                condition: condition.to_string(),
            },
            Some(recipient.into()),
            format!("Stock Alert Triggered: {}", symbol),
            message,
        )
    }
}

/// A way of reaching users.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("No recipient for notification '{0}'")]
    NoRecipient(String),
}

/// Dispatches notifications to every configured channel.
#[derive(Clone)]
pub struct NotificationService {
    channels: Arc<Vec<Box<dyn NotificationChannel>>>,
}

impl NotificationService {
    /// Channels for whatever is configured; with nothing configured, notifications are dropped.
    pub fn new(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        match &config.smtp {
            Some(settings) => match SmtpNotifier::new(settings) {
                Ok(notifier) => {
                    tracing::info!("Email alerts via {}:{}", settings.host, settings.port);
                    channels.push(Box::new(notifier));
                }
                Err(e) => tracing::warn!("Email alerts disabled: {}", e),
            },
            None => tracing::info!("Email alerts disabled: SMTP_HOST or SMTP_FROM_ADDRESS missing"),
        }

        Self::with_channels(channels)
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self {
            channels: Arc::new(channels),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver in the background.
    pub fn send_alert(&self, notification: Notification) {
        let service = self.clone();
        tokio::spawn(async move {
            service.send_alert_async(&notification).await;
        });
    }

    /// Deliver through every channel in turn; returns how many accepted the notification.
    /// A failing channel is logged and does not stop the others.
    pub async fn send_alert_async(&self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for channel in self.channels.iter() {
            if let Err(e) = channel.send(notification).await {
                tracing::warn!(channel = channel.name(), "Notification '{}' not delivered: {}", notification.title, e);
                continue;
            }
            delivered += 1;
        }
        delivered
    }
}
