//! Outbound notification of crisis replies.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{ChannelError, ConfigError};

/// Delivers a reply to a recipient.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Channel name for logs, e.g. `"smtp"`.
    fn name(&self) -> &str;

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError>;
}

/// Outcome of one delivery attempt as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<(), ChannelError>> for DeliveryReport {
    fn from(result: Result<(), ChannelError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                error: None,
            },
            Err(e) => Self {
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

// ── SMTP ────────────────────────────────────────────────────────────

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

const DEFAULT_SMTP_PORT: u16 = 587;

impl SmtpConfig {
    /// Build config from `CRISIS_SMTP_*` environment variables.
    /// Returns `Ok(None)` if `CRISIS_SMTP_HOST` is not set (SMTP disabled).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(host) = var("CRISIS_SMTP_HOST") else {
            return Ok(None);
        };

        let port = match var("CRISIS_SMTP_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CRISIS_SMTP_PORT".to_string(),
                message: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let username = var("CRISIS_SMTP_USERNAME").unwrap_or_default();
        let password = var("CRISIS_SMTP_PASSWORD").unwrap_or_default();
        // Relays usually accept the login as sender
        let from_address = var("CRISIS_SMTP_FROM_ADDRESS")
            .or_else(|| Some(username.clone()).filter(|u| !u.is_empty()))
            .ok_or_else(|| ConfigError::MissingEnvVar("CRISIS_SMTP_FROM_ADDRESS".to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username,
            password: SecretString::from(password),
            from_address,
        }))
    }
}

/// Sends replies through an SMTP relay.
pub struct SmtpNotifier {
    config: SmtpConfig,
}

impl SmtpNotifier {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NotificationSender for SmtpNotifier {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        let email = build_message(&self.config.from_address, recipient, subject, body)?;
        let config = self.config.clone();

        // lettre's SmtpTransport is blocking
        tokio::task::spawn_blocking(move || send_blocking(&config, &email))
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "smtp".into(),
                reason: format!("SMTP task failed: {e}"),
            })??;

        tracing::info!(recipient, "Crisis reply sent");
        Ok(())
    }
}

fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message, ChannelError> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| ChannelError::InvalidAddress(format!("from {from:?}: {e}")))?;
    let to: Mailbox = to
        .parse()
        .map_err(|e| ChannelError::InvalidAddress(format!("to {to:?}: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("Failed to build email: {e}"),
        })
}

fn send_blocking(config: &SmtpConfig, email: &Message) -> Result<(), ChannelError> {
    let creds = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::relay(&config.host)
        .map_err(|e| ChannelError::SendFailed {
            name: "smtp".into(),
            reason: format!("SMTP relay error: {e}"),
        })?
        .port(config.port)
        .credentials(creds)
        .build();

    transport.send(email).map_err(|e| ChannelError::SendFailed {
        name: "smtp".into(),
        reason: format!("SMTP send failed: {e}"),
    })?;
    Ok(())
}

// ── Log-only ────────────────────────────────────────────────────────

/// Writes replies to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        if recipient.trim().is_empty() {
            return Err(ChannelError::InvalidAddress("empty recipient".into()));
        }
        tracing::info!(recipient, subject, body, "Crisis reply (not delivered)");
        Ok(())
    }
}
