//! SMTP email provider using lettre

use super::{EmailProvider, SendResult};
use crate::error::NotificationError;
use crate::models::Email;
use async_trait::async_trait;
use core_config::{env_or_default, env_parse_or, ConfigError, FromEnv};
use eyre::{Result, WrapErr};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::str::FromStr;
use std::sync::Arc;

/// How the SMTP connection is secured
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS (port 587)
    #[default]
    StartTls,
    /// TLS from the first byte (port 465)
    Tls,
    /// No encryption (Mailpit/Mailhog)
    None,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(TlsMode::StartTls),
            "tls" => Ok(TlsMode::Tls),
            "none" | "off" => Ok(TlsMode::None),
            other => Err(format!("expected starttls, tls or none, got '{}'", other)),
        }
    }
}

/// SMTP provider configuration
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub tls: TlsMode,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from_email", &self.from_email)
            .field("tls", &self.tls)
            .finish()
    }
}

impl FromEnv for SmtpConfig {
    /// - SMTP_HOST: defaults to smtp.ethereal.email
    /// - SMTP_PORT: defaults to 587
    /// - SMTP_USERNAME / SMTP_PASSWORD: empty means no authentication
    /// - EMAIL_FROM_ADDRESS: defaults to the username, then noreply@localhost
    /// - SMTP_TLS: starttls (default), tls or none
    fn from_env() -> Result<Self, ConfigError> {
        let username = env_or_default("SMTP_USERNAME", "");
        let default_from = if username.is_empty() {
            "noreply@localhost".to_string()
        } else {
            username.clone()
        };

        let tls = env_or_default("SMTP_TLS", "starttls")
            .parse::<TlsMode>()
            .map_err(|details| ConfigError::InvalidValue {
                key: "SMTP_TLS".to_string(),
                details,
            })?;

        Ok(Self {
            host: env_or_default("SMTP_HOST", "smtp.ethereal.email"),
            port: env_parse_or("SMTP_PORT", 587)?,
            password: env_or_default("SMTP_PASSWORD", ""),
            from_email: env_or_default("EMAIL_FROM_ADDRESS", &default_from),
            username,
            tls,
        })
    }
}

/// SMTP email provider
pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpProvider {
    /// Create a new SMTP provider. No connection is made until the first send.
    pub fn new(config: SmtpConfig) -> Result<Self, NotificationError> {
        let builder = match config.tls {
            TlsMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotificationError::Provider(format!("STARTTLS relay: {}", e)))?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotificationError::Provider(format!("TLS relay: {}", e)))?,
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let builder = builder.port(config.port);
        let transport = if config.username.is_empty() {
            builder.build()
        } else {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            builder.credentials(creds).build()
        };

        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    fn build_message(&self, email: &Email) -> Result<Message> {
        let from: Mailbox = self
            .config
            .from_email
            .parse()
            .wrap_err("Invalid from address")?;
        let to: Mailbox = email.to.parse().wrap_err("Invalid to address")?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .wrap_err("Failed to build HTML message")
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> Result<SendResult> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err_with(|| format!("Failed to send email via {}", self.config.host))?;

        let message_id = response
            .message()
            .next()
            .map(|s| s.to_string())
            .unwrap_or_else(|| email.id.clone());

        tracing::info!(
            email_id = %email.id,
            to = %email.to,
            subject = %email.subject,
            "Email sent successfully"
        );

        Ok(SendResult { message_id })
    }

    async fn health_check(&self) -> Result<()> {
        self.transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
