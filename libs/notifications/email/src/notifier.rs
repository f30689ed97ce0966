//! [`Notifier`] implementation that emails the customer.

use crate::error::NotificationResult;
use crate::models::Email;
use crate::provider::EmailProvider;
use crate::templates::{ORDER_PROCESSED, TemplateEngine};
use async_trait::async_trait;
use core_config::{env_or_default, ConfigError, FromEnv};
use domain_orders::{Notifier, Order};
use eyre::WrapErr;
use tracing::{debug, instrument};

/// Where processed-order emails go.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub recipient: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            recipient: "customer@example.com".to_string(),
        }
    }
}

impl FromEnv for NotifierConfig {
    /// - NOTIFY_RECIPIENT: defaults to customer@example.com
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            recipient: env_or_default("NOTIFY_RECIPIENT", "customer@example.com"),
        })
    }
}

/// Renders the `order_processed` template and sends it through `P`.
pub struct EmailNotifier<P> {
    provider: P,
    templates: TemplateEngine,
    config: NotifierConfig,
}

impl<P: EmailProvider> EmailNotifier<P> {
    pub fn new(provider: P, config: NotifierConfig) -> NotificationResult<Self> {
        Ok(Self {
            provider,
            templates: TemplateEngine::new()?,
            config,
        })
    }

    /// Build the email for an order without sending it.
    pub fn compose(&self, order: &Order) -> NotificationResult<Email> {
        let rendered = self.templates.render(ORDER_PROCESSED, order)?;
        Ok(Email::new(
            self.config.recipient.clone(),
            rendered.subject,
            rendered.html,
        ))
    }
}

#[async_trait]
impl<P: EmailProvider> Notifier for EmailNotifier<P> {
    #[instrument(skip(self, order), fields(order_id = order.id))]
    async fn notify(&self, order: &Order) -> eyre::Result<()> {
        let email = self
            .compose(order)
            .wrap_err_with(|| format!("Failed to render email for order {}", order.id))?;

        let result = self
            .provider
            .send(&email)
            .await
            .wrap_err_with(|| format!("Failed to email {}", self.config.recipient))?;

        debug!(message_id = %result.message_id, "Notification email accepted");
        Ok(())
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
