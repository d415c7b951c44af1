use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{SmtpSettings, TlsMode};
use crate::templates::EmailTemplate;
use crate::{Notification, NotificationChannel, NotificationError};

type Transport = AsyncSmtpTransport<Tokio1Executor>;

/// Delivers notifications by email, one message per recipient.
pub struct SmtpNotifier {
    transport: Transport,
    sender: Mailbox,
    fallback: Vec<Mailbox>,
}

fn mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::Config(format!("Invalid email address {}: {}", address, e)))
}

impl SmtpNotifier {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let relay = match settings.tls {
            TlsMode::StartTls => Transport::starttls_relay(&settings.host),
            TlsMode::Wrapper => Transport::relay(&settings.host),
            TlsMode::Plain => Ok(Transport::builder_dangerous(&settings.host)),
        }
        .map_err(|e| NotificationError::Smtp(format!("Cannot reach {}: {}", settings.host, e)))?;

        let mut relay = relay.port(settings.port);
        if let Some((user, password)) = &settings.credentials {
            relay = relay.credentials(Credentials::new(user.clone(), password.clone()));
        }

        let mut fallback = Vec::new();
        for address in &settings.fallback_recipients {
            match mailbox(address) {
                Ok(mb) => fallback.push(mb),
                Err(e) => tracing::warn!("Ignoring fallback recipient: {}", e),
            }
        }

        Ok(Self {
            transport: relay.build(),
            sender: mailbox(&settings.from_address)?,
            fallback,
        })
    }

    fn recipients(&self, notification: &Notification) -> Result<Vec<Mailbox>, NotificationError> {
        if let Some(address) = notification.recipient.as_deref() {
            return Ok(vec![mailbox(address)?]);
        }
        if self.fallback.is_empty() {
            return Err(NotificationError::NoRecipient(notification.title.clone()));
        }
        Ok(self.fallback.clone())
    }

    fn compose(&self, to: Mailbox, notification: &Notification) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(notification.title.as_str())
            .multipart(MultiPart::alternative_plain_html(
                EmailTemplate::render_text(notification),
                EmailTemplate::render(notification),
            ))
            .map_err(|e| NotificationError::Smtp(format!("Cannot build message: {}", e)))
    }
}

#[async_trait]
impl NotificationChannel for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        for to in self.recipients(notification)? {
            let message = self.compose(to.clone(), notification)?;
            self.transport
                .send(message)
                .await
                .map_err(|e| NotificationError::Smtp(format!("Delivery to {} failed: {}", to, e)))?;
            tracing::info!(recipient = %to, "Emailed '{}'", notification.title);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_string(),
            port: 2525,
            credentials: None,
            from_address: "Cosine Alerts <alerts@cosine.dev>".to_string(),
            fallback_recipients: vec!["ops@cosine.dev".to_string(), "not an address".to_string()],
            tls: TlsMode::Plain,
        }
    }

    #[tokio::test]
    async fn test_recipient_resolution() {
        let notifier = SmtpNotifier::new(&settings()).unwrap();

        let addressed = Notification::price_threshold("AAPL", 1.0, 1.0, "above", "me@example.com");
        let to = notifier.recipients(&addressed).unwrap();
        assert_eq!(to.len(), 1);
        assert_eq!(to[0].email.to_string(), "me@example.com");

        let mut unaddressed = addressed.clone();
        unaddressed.recipient = None;
        let to = notifier.recipients(&unaddressed).unwrap();
        assert_eq!(to.len(), 1);
        assert_eq!(to[0].email.to_string(), "ops@cosine.dev");
    }

    #[tokio::test]
    async fn test_bad_sender_is_rejected() {
        let mut bad = settings();
        bad.from_address = "nobody".to_string();
        assert!(matches!(SmtpNotifier::new(&bad), Err(NotificationError::Config(_))));
    }

    #[tokio::test]
    async fn test_compose_sets_subject() {
        let notifier = SmtpNotifier::new(&settings()).unwrap();
        let n = Notification::price_threshold("msft", 410.0, 400.0, "above", "me@example.com");
        let message = notifier.compose(mailbox("me@example.com").unwrap(), &n).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Stock Alert Triggered: MSFT"));
    }
}
