//! Pipeline counters, exported through the channel's Prometheus recorder.

use metrics::counter;

#[derive(Clone, Debug)]
pub struct OrderMetrics {
    consumer: String,
}

impl OrderMetrics {
    /// `consumer` labels the consume-side counters (group name or "dispatcher").
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
        }
    }

    pub fn order_published(&self) {
        counter!("orders_published_total").increment(1);
    }

    pub fn publish_failed(&self) {
        counter!("orders_publish_failures_total").increment(1);
    }

    pub fn order_consumed(&self) {
        counter!("orders_consumed_total", "consumer" => self.consumer.clone()).increment(1);
    }

    pub fn order_malformed(&self) {
        counter!("orders_malformed_total", "consumer" => self.consumer.clone()).increment(1);
    }

    pub fn consumer_recovered(&self) {
        counter!("consumer_recoveries_total", "consumer" => self.consumer.clone()).increment(1);
    }

    /// `outcome` is one of `sent`, `failed` or `suppressed`.
    pub fn notification(&self, outcome: &'static str) {
        counter!("notifications_total", "outcome" => outcome).increment(1);
    }

    pub fn idle_window(&self) {
        counter!("notification_windows_idle_total").increment(1);
    }
}
