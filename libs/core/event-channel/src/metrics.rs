//! Prometheus metrics for event channel backends
//!
//! Installs the process-wide recorder and provides per-topic counters used
//! by the Redis backend.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics initialized");
            }
        }
        Err(e) => warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get the Prometheus handle for rendering metrics
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Render metrics in Prometheus text format (empty before `init_metrics`)
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Per-topic channel counters
#[derive(Clone, Debug)]
pub struct ChannelMetrics {
    topic: String,
}

impl ChannelMetrics {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    pub fn record_appended(&self) {
        counter!(
            "event_channel_records_appended_total",
            "topic" => self.topic.clone()
        )
        .increment(1);
    }

    pub fn records_delivered(&self, group: &str, count: usize) {
        counter!(
            "event_channel_records_delivered_total",
            "topic" => self.topic.clone(),
            "group" => group.to_string()
        )
        .increment(count as u64);
    }

    pub fn record_committed(&self, group: &str) {
        counter!(
            "event_channel_commits_total",
            "topic" => self.topic.clone(),
            "group" => group.to_string()
        )
        .increment(1);
    }

    pub fn records_claimed(&self, group: &str, count: usize) {
        counter!(
            "event_channel_records_claimed_total",
            "topic" => self.topic.clone(),
            "group" => group.to_string()
        )
        .increment(count as u64);
    }

    pub fn group_joined(&self, group: &str) {
        counter!(
            "event_channel_group_joins_total",
            "topic" => self.topic.clone(),
            "group" => group.to_string()
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_idempotent_after_init() {
        init_metrics();
        init_metrics();

        let metrics = ChannelMetrics::new("orders");
        metrics.record_appended();
        metrics.record_committed("order-processors");

        let rendered = render_metrics();
        assert!(rendered.contains("event_channel_records_appended_total"));
    }
}
