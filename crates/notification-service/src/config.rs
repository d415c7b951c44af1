use std::env;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    StartTls,
    /// Implicit TLS, usually port 465.
    Wrapper,
    Plain,
}

impl TlsMode {
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => TlsMode::Wrapper,
            "none" | "plain" => TlsMode::Plain,
            _ => TlsMode::StartTls,
        }
    }
}

/// Mail server settings. Present only when both a host and a sender are configured.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
    pub from_address: String,
    /// Used for notifications that are not addressed to anyone.
    pub fallback_recipients: Vec<String>,
    pub tls: TlsMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationConfig {
    pub smtp: Option<SmtpSettings>,
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl NotificationConfig {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM_ADDRESS`,
    /// `SMTP_TLS` and `NOTIFICATION_EMAIL_TO` (comma separated).
    pub fn from_env() -> Self {
        let smtp = match (env_value("SMTP_HOST"), env_value("SMTP_FROM_ADDRESS")) {
            (Some(host), Some(from_address)) => {
                let port = env_value("SMTP_PORT").and_then(|p| p.parse().ok()).unwrap_or(587);
                let credentials = env_value("SMTP_USERNAME").zip(env_value("SMTP_PASSWORD"));
                Some(SmtpSettings {
                    host,
                    port,
                    credentials,
                    from_address,
                    fallback_recipients: env_value("NOTIFICATION_EMAIL_TO")
                        .map(|list| split_addresses(&list))
                        .unwrap_or_default(),
                    tls: env_value("SMTP_TLS")
                        .map(|v| TlsMode::from_setting(&v))
                        .unwrap_or_default(),
                })
            }
            _ => None,
        };
        Self { smtp }
    }

    pub fn smtp_enabled(&self) -> bool {
        self.smtp.is_some()
    }
}

fn split_addresses(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
