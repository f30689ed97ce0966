//! The processing side effect run by the consumer group for each processed order.

use crate::error::OrderError;
use crate::models::Order;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait OrderProcessor: Send + Sync + 'static {
    /// Process one order. Failures are logged by the caller and never block
    /// the commit of the record.
    async fn process(&self, order: &Order) -> Result<(), OrderError>;
}

/// Logs each processed order.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingOrderProcessor;

#[async_trait]
impl OrderProcessor for LoggingOrderProcessor {
    async fn process(&self, order: &Order) -> Result<(), OrderError> {
        info!(order_id = order.id, status = %order.status, "Processing Order ID");
        Ok(())
    }
}

#[async_trait]
impl<P: OrderProcessor> OrderProcessor for std::sync::Arc<P> {
    async fn process(&self, order: &Order) -> Result<(), OrderError> {
        (**self).process(order).await
    }
}
