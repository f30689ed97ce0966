//! Notification Dispatcher
//!
//! Reads `orders` on its own (no consumer group) and notifies the customer
//! for processed orders, at most once per dedup window. The loop wakes on the
//! next record or when `idle_timeout` has passed since the last record or
//! timeout. A timeout closes the window and starts a fresh one. Read errors
//! are logged and backed off without moving the idle deadline.

use crate::error::OrderError;
use crate::metrics::OrderMetrics;
use crate::models::Order;
use crate::notifier::Notifier;
use crate::signal::raised;
use crate::window::{DedupPolicy, NotificationWindow, WindowOutcome};
use event_channel::{Record, StandaloneReader};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Quiet period after the last wake that closes the window
    pub idle_timeout: Duration,
    pub dedup: DedupPolicy,
    /// Pause after a failed read before waiting again
    pub read_error_backoff: Duration,
}

impl DispatcherConfig {
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn with_read_error_backoff(mut self, backoff: Duration) -> Self {
        self.read_error_backoff = backoff;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            dedup: DedupPolicy::GlobalWindow,
            read_error_backoff: Duration::from_secs(1),
        }
    }
}

enum Wake {
    Shutdown,
    Read(Result<Record, event_channel::ChannelError>),
    IdleTimeout,
}

pub struct NotificationDispatcher<R: StandaloneReader, N: Notifier> {
    reader: R,
    notifier: N,
    config: DispatcherConfig,
    metrics: OrderMetrics,
}

impl<R: StandaloneReader, N: Notifier> NotificationDispatcher<R, N> {
    pub fn new(reader: R, notifier: N, config: DispatcherConfig) -> Self {
        Self {
            reader,
            notifier,
            config,
            metrics: OrderMetrics::new("dispatcher"),
        }
    }

    /// Run until `shutdown` is raised. The window is local to this loop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), OrderError> {
        let mut window = NotificationWindow::new(self.config.dedup.clone());

        info!(
            notifier = %self.notifier.name(),
            idle_timeout_secs = self.config.idle_timeout.as_secs_f64(),
            dedup = ?self.config.dedup,
            "Notification dispatcher started"
        );

        // Only a record or the timer itself moves the deadline
        let mut deadline = Instant::now() + self.config.idle_timeout;

        loop {
            let wake = tokio::select! {
                biased;
                _ = raised(&mut shutdown) => Wake::Shutdown,
                _ = tokio::time::sleep_until(deadline) => Wake::IdleTimeout,
                read = self.reader.next() => Wake::Read(read),
            };

            match wake {
                Wake::Shutdown => break,
                Wake::Read(Ok(record)) => {
                    Self::on_record(&self.notifier, &self.metrics, &mut window, &record).await;
                    deadline = Instant::now() + self.config.idle_timeout;
                }
                Wake::Read(Err(e)) => {
                    warn!(error = %e, "Failed to read from orders topic");
                    tokio::select! {
                        _ = raised(&mut shutdown) => break,
                        _ = tokio::time::sleep(self.config.read_error_backoff) => {}
                    }
                }
                Wake::IdleTimeout => {
                    if window.close(Instant::now()) == WindowOutcome::Idle {
                        info!("No new messages received.");
                        self.metrics.idle_window();
                    } else {
                        debug!("Notification window reset");
                    }
                    deadline = Instant::now() + self.config.idle_timeout;
                }
            }
        }

        info!("Notification dispatcher stopping");
        Ok(())
    }

    async fn on_record(
        notifier: &N,
        metrics: &OrderMetrics,
        window: &mut NotificationWindow,
        record: &Record,
    ) {
        let order = match Order::from_payload(&record.payload) {
            Ok(order) => order,
            Err(e) => {
                metrics.order_malformed();
                warn!(offset = %record.offset, error = %e, "Error unmarshaling order");
                return;
            }
        };
        metrics.order_consumed();

        if order.is_processed() {
            info!(order_id = order.id, status = %order.status, "Processing Order ID");

            if window.claim_notification(order.id, Instant::now()) {
                match notifier.notify(&order).await {
                    Ok(()) => {
                        metrics.notification("sent");
                        info!(
                            order_id = order.id,
                            notifier = %notifier.name(),
                            "Notification sent successfully"
                        );
                    }
                    Err(e) => {
                        metrics.notification("failed");
                        error!(order_id = order.id, error = ?e, "Error sending notification");
                    }
                }
            } else {
                metrics.notification("suppressed");
                debug!(order_id = order.id, "Notification already sent this window");
            }
        }

        window.record_message();
    }
}
