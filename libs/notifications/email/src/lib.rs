//! Email delivery for processed orders
//!
//! Implements the [`domain_orders::Notifier`] seam: an order is rendered
//! through a handlebars template and sent to a fixed recipient over SMTP.
//!
//! ## Components
//!
//! - **Models**: `Email`
//! - **Providers**: `SmtpProvider` (lettre) and `MockEmailProvider` for tests
//! - **Templates**: Handlebars-based `TemplateEngine` with the `order_processed` template
//! - **Notifier**: `EmailNotifier`, what the notification dispatcher calls
//!
//! ## Usage
//!
//! ```ignore
//! use email::{EmailNotifier, NotifierConfig, SmtpConfig, SmtpProvider};
//!
//! let provider = SmtpProvider::new(SmtpConfig::from_env()?)?;
//! let notifier = EmailNotifier::new(provider, NotifierConfig::from_env()?)?;
//! notifier.notify(&Order::processed(1)).await?;
//! ```

pub mod error;
pub mod models;
pub mod notifier;
pub mod provider;
pub mod templates;

pub use error::{NotificationError, NotificationResult};
pub use models::Email;
pub use notifier::{EmailNotifier, NotifierConfig};
pub use provider::{EmailProvider, MockEmailProvider, SendResult, SmtpConfig, SmtpProvider, TlsMode};
pub use templates::{ORDER_PROCESSED, RenderedTemplate, TemplateEngine};
