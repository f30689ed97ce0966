//! The customer notification seam used by the dispatcher.

use crate::models::Order;
use async_trait::async_trait;
use std::sync::Arc;

/// Sends a customer-facing notification for a processed order.
///
/// The dispatcher only distinguishes success from failure; rendering and
/// transport are the implementation's concern.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order: &Order) -> eyre::Result<()>;

    /// Name used in logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    async fn notify(&self, order: &Order) -> eyre::Result<()> {
        (**self).notify(order).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
