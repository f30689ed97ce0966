//! Consumer Group Manager
//!
//! Keeps a long-lived membership in the `orders` consumer group and recovers
//! from broken consume loops.
//!
//! ```text
//!            consume error                 backoff elapsed
//! Running ─────────────────▶ Failed ─────────────────────▶ Recovering
//!    ▲                         ▲                               │
//!    │      join succeeded     │        join failed            │
//!    └─────────────────────────┼───────────────────────────────┤
//!                              └───────────────────────────────┘
//!
//! interrupt or claim completed ──▶ Closed
//! ```
//!
//! The consume loop runs on its own task. [`ConsumerGroupManager::run_until`]
//! waits for either the interrupt or the loop's completion signal, then asks
//! the loop to close and waits for it before returning.

use crate::error::OrderError;
use crate::metrics::OrderMetrics;
use crate::models::{Order, OrdersTopic};
use crate::processor::OrderProcessor;
use crate::signal::raised;
use crate::slot::MembershipSlot;
use event_channel::{ChannelError, GroupMembership, GroupSubscription, MembershipFactory, Record};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub subscription: GroupSubscription,
    /// Fixed delay before each recovery attempt
    pub recovery_backoff: Duration,
    /// `None` retries recovery forever
    pub max_recovery_attempts: Option<u32>,
}

impl ManagerConfig {
    pub fn new(subscription: GroupSubscription) -> Self {
        Self {
            subscription,
            recovery_backoff: Duration::from_secs(5),
            max_recovery_attempts: None,
        }
    }

    pub fn with_recovery_backoff(mut self, backoff: Duration) -> Self {
        self.recovery_backoff = backoff;
        self
    }

    pub fn with_max_recovery_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new(GroupSubscription::from_topic_def::<OrdersTopic>())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Running,
    Failed,
    Recovering,
    Closed,
}

/// Why [`ConsumerGroupManager::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerExit {
    Interrupted,
    ClaimCompleted,
}

/// How a consume pass ended without error.
enum ConsumeOutcome {
    CloseRequested,
    ClaimCompleted,
}

pub struct ConsumerGroupManager<F: MembershipFactory, P: OrderProcessor> {
    factory: Arc<F>,
    processor: Arc<P>,
    config: ManagerConfig,
    state: Arc<watch::Sender<ManagerState>>,
}

impl<F: MembershipFactory, P: OrderProcessor> ConsumerGroupManager<F, P> {
    pub fn new(factory: F, processor: P, config: ManagerConfig) -> Self {
        Self::from_arcs(Arc::new(factory), Arc::new(processor), config)
    }

    pub fn from_arcs(factory: Arc<F>, processor: Arc<P>, config: ManagerConfig) -> Self {
        let (state, _) = watch::channel(ManagerState::Closed);
        Self {
            factory,
            processor,
            config,
            state: Arc::new(state),
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ManagerState> {
        self.state.subscribe()
    }

    /// Join the group and consume until `interrupt` resolves or the claim completes.
    ///
    /// Only the initial join error is returned as-is; later consume errors go
    /// through recovery.
    pub async fn run_until<I>(&self, interrupt: I) -> Result<ManagerExit, OrderError>
    where
        I: Future<Output = ()>,
    {
        let subscription = self.config.subscription.clone();
        let slot = MembershipSlot::join(self.factory.clone(), subscription.clone()).await?;

        self.state.send_replace(ManagerState::Running);
        info!(
            topic = %subscription.topic,
            group = %subscription.group,
            consumer = %subscription.consumer_id,
            "Consumer is now consuming messages"
        );

        let (close_tx, close_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();

        let worker = ConsumeWorker {
            slot,
            processor: self.processor.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            close: close_rx,
            metrics: OrderMetrics::new(subscription.group.clone()),
        };

        let handle = tokio::spawn(async move {
            let result = worker.run().await;
            let _ = done_tx.send(());
            result
        });

        tokio::pin!(interrupt);
        let exit = tokio::select! {
            _ = &mut interrupt => ManagerExit::Interrupted,
            _ = done_rx => ManagerExit::ClaimCompleted,
        };

        let _ = close_tx.send(true);
        let result = handle.await;
        self.state.send_replace(ManagerState::Closed);

        match result {
            Ok(Ok(())) => Ok(exit),
            Ok(Err(e)) => Err(e),
            Err(e) => {
                error!(error = %e, "Consume worker panicked");
                Err(OrderError::WorkerPanicked)
            }
        }
    }
}

struct ConsumeWorker<F: MembershipFactory, P: OrderProcessor> {
    slot: MembershipSlot<F>,
    processor: Arc<P>,
    config: ManagerConfig,
    state: Arc<watch::Sender<ManagerState>>,
    close: watch::Receiver<bool>,
    metrics: OrderMetrics,
}

impl<F: MembershipFactory, P: OrderProcessor> ConsumeWorker<F, P> {
    async fn run(mut self) -> Result<(), OrderError> {
        let result = self.consume_with_recovery().await;
        self.slot.discard().await;
        result
    }

    async fn consume_with_recovery(&mut self) -> Result<(), OrderError> {
        loop {
            match self.consume().await {
                Ok(ConsumeOutcome::CloseRequested) => return Ok(()),
                Ok(ConsumeOutcome::ClaimCompleted) => {
                    info!("Claim completed");
                    return Ok(());
                }
                Err(e) => {
                    self.state.send_replace(ManagerState::Failed);
                    error!(error = %e, "Error from consumer");
                    if !self.recover().await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Consume claimed batches until the claim ends, a close is requested or an error occurs.
    async fn consume(&mut self) -> Result<ConsumeOutcome, ChannelError> {
        loop {
            let membership = self.slot.current()?;

            let batch = tokio::select! {
                _ = raised(&mut self.close) => return Ok(ConsumeOutcome::CloseRequested),
                batch = membership.next_batch() => batch?,
            };

            let Some(batch) = batch else {
                return Ok(ConsumeOutcome::ClaimCompleted);
            };

            debug!(count = batch.len(), "Received batch");
            for record in &batch {
                handle_record(membership, self.processor.as_ref(), &self.metrics, record).await?;
            }
        }
    }

    /// Back off, then replace the membership until a join succeeds.
    ///
    /// Returns `Ok(false)` when a close was requested while recovering.
    async fn recover(&mut self) -> Result<bool, OrderError> {
        let mut attempts = 0u32;

        loop {
            info!(
                backoff_secs = self.config.recovery_backoff.as_secs_f64(),
                "Attempting to recover the consumer"
            );
            tokio::select! {
                _ = raised(&mut self.close) => return Ok(false),
                _ = tokio::time::sleep(self.config.recovery_backoff) => {}
            }

            self.state.send_replace(ManagerState::Recovering);
            attempts += 1;

            match self.slot.replace().await {
                Ok(()) => {
                    self.state.send_replace(ManagerState::Running);
                    self.metrics.consumer_recovered();
                    info!(
                        attempts,
                        generation = self.slot.generation(),
                        "Consumer recovered successfully"
                    );
                    return Ok(true);
                }
                Err(e) => {
                    self.state.send_replace(ManagerState::Failed);
                    error!(error = %e, attempts, "Error creating a new consumer");

                    if let Some(max) = self.config.max_recovery_attempts {
                        if attempts >= max {
                            return Err(OrderError::RecoveryExhausted { attempts });
                        }
                    }
                }
            }
        }
    }
}

/// Deserialize, process if processed, and always commit.
async fn handle_record<M, P>(
    membership: &mut M,
    processor: &P,
    metrics: &OrderMetrics,
    record: &Record,
) -> Result<(), ChannelError>
where
    M: GroupMembership,
    P: OrderProcessor,
{
    match Order::from_payload(&record.payload) {
        Ok(order) => {
            metrics.order_consumed();
            if order.is_processed() {
                if let Err(e) = processor.process(&order).await {
                    warn!(order_id = order.id, error = %e, "Order processing failed");
                }
            } else {
                debug!(order_id = order.id, status = %order.status, "Ignoring order");
            }
        }
        Err(e) => {
            metrics.order_malformed();
            warn!(
                offset = %record.offset,
                payload = %record.payload_lossy(),
                error = %e,
                "Error unmarshaling order, skipping"
            );
        }
    }

    membership.commit(record).await
}
