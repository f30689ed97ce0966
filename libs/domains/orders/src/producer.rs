//! Order Producer
//!
//! Publishes orders to the `orders` topic. A call returns only after the
//! channel acknowledged the write at its configured durability, so callers
//! can report success synchronously.

use crate::error::PublishError;
use crate::metrics::OrderMetrics;
use crate::models::{Order, OrdersTopic};
use event_channel::{Ack, ChannelError, Publisher, RetryConfig, TopicDef, retry_with_backoff_if};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub topic: String,
    /// Transient failures are retried up to `retry.max_retries` times
    pub retry: RetryConfig,
}

impl ProducerConfig {
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            topic: OrdersTopic::TOPIC_NAME.to_string(),
            retry: RetryConfig::new().with_max_retries(5),
        }
    }
}

/// Places orders on the event channel.
#[derive(Clone)]
pub struct OrderProducer {
    publisher: Arc<dyn Publisher>,
    config: ProducerConfig,
    metrics: OrderMetrics,
}

impl OrderProducer {
    pub fn new(publisher: Arc<dyn Publisher>, config: ProducerConfig) -> Self {
        Self {
            publisher,
            config,
            metrics: OrderMetrics::new("producer"),
        }
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Serialize and publish an order with no partition key.
    #[instrument(skip(self, order), fields(order_id = order.id, status = %order.status))]
    pub async fn place(&self, order: &Order) -> Result<Ack, PublishError> {
        let payload = order.to_payload()?;
        let attempts = AtomicU32::new(0);

        let result = retry_with_backoff_if(
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.publisher.publish(&self.config.topic, None, &payload)
            },
            self.config.retry.clone(),
            ChannelError::is_transient,
        )
        .await;

        let attempts = attempts.into_inner();
        match result {
            Ok(ack) => {
                info!(offset = %ack.offset, attempts, "Order placed");
                self.metrics.order_published();
                Ok(ack)
            }
            Err(e) => {
                error!(error = %e, attempts, "Failed to place order");
                self.metrics.publish_failed();
                if e.is_transient() {
                    Err(PublishError::Exhausted {
                        attempts,
                        source: e,
                    })
                } else {
                    Err(PublishError::Rejected(e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_channel::InMemoryBroker;

    fn producer(broker: &InMemoryBroker) -> OrderProducer {
        let config = ProducerConfig::default()
            .with_retry(RetryConfig::new().with_max_retries(5).without_jitter());
        OrderProducer::new(Arc::new(broker.clone()), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_appends_order() {
        let broker = InMemoryBroker::new();
        let ack = producer(&broker).place(&Order::processed(1)).await.unwrap();

        assert_eq!(ack.topic, "orders");
        let records = broker.records("orders");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, None);
        assert_eq!(Order::from_payload(&records[0].payload).unwrap(), Order::processed(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_retries_transient_failures() {
        let broker = InMemoryBroker::new();
        broker.fail_next_publishes(3);

        producer(&broker).place(&Order::processed(7)).await.unwrap();
        assert_eq!(broker.records("orders").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_exhausts_retries() {
        let broker = InMemoryBroker::new();
        broker.fail_next_publishes(100);

        let err = producer(&broker).place(&Order::processed(7)).await.unwrap_err();
        match err {
            PublishError::Exhausted { attempts, .. } => assert_eq!(attempts, 6),
            other => panic!("unexpected error: {other}"),
        }
        assert!(broker.records("orders").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_place_does_not_retry_rejections() {
        let broker = InMemoryBroker::new();
        broker.reject_next_publishes(1);

        let err = producer(&broker).place(&Order::processed(7)).await.unwrap_err();
        assert!(matches!(err, PublishError::Rejected(_)));

        // The rejection consumed only one attempt
        producer(&broker).place(&Order::processed(8)).await.unwrap();
        assert_eq!(broker.records("orders").len(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = ProducerConfig::default();
        assert_eq!(config.topic, "orders");
        assert_eq!(config.retry.max_retries, 5);
    }
}
