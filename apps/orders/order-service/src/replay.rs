//! Periodic re-publish of a processed order.
//!
//! Keeps the notification path warm in environments with no live traffic.

use domain_orders::{Order, OrderProducer};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

/// Order ID re-published on every tick
pub const REPLAY_ORDER_ID: i64 = 1;

/// Publish `{id: 1, status: "processed"}` every `period` until shutdown.
///
/// The first publish happens one full period after start.
pub async fn replay_processed(
    producer: OrderProducer,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "Order replay enabled");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if let Err(e) = producer.place(&Order::processed(REPLAY_ORDER_ID)).await {
                    warn!(error = %e, "Replay publish failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_orders::ProducerConfig;
    use event_channel::InMemoryBroker;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_replays_each_period_until_shutdown() {
        let broker = InMemoryBroker::new();
        let producer = OrderProducer::new(Arc::new(broker.clone()), ProducerConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(replay_processed(
            producer,
            Duration::from_secs(300),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(broker.records("orders").is_empty());

        tokio::time::sleep(Duration::from_secs(302)).await;
        let records = broker.records("orders");
        assert_eq!(records.len(), 2);
        let order = Order::from_payload(&records[0].payload).unwrap();
        assert_eq!(order, Order::processed(REPLAY_ORDER_ID));

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}
