//! Replaceable consumer-group membership.

use event_channel::{ChannelError, GroupMembership, GroupSubscription, MembershipFactory};
use std::sync::Arc;
use tracing::{debug, warn};

/// Single owner of the current group membership.
///
/// Recovery never repairs a membership: [`replace`](Self::replace) closes and
/// discards the current handle, then joins a brand-new one that becomes the
/// sole owner of subsequent claims. Only the consume loop holds the slot.
pub struct MembershipSlot<F: MembershipFactory> {
    factory: Arc<F>,
    subscription: GroupSubscription,
    current: Option<F::Membership>,
    generation: u64,
}

impl<F: MembershipFactory> MembershipSlot<F> {
    /// Join the group and hold the resulting membership.
    pub async fn join(factory: Arc<F>, subscription: GroupSubscription) -> Result<Self, ChannelError> {
        let membership = factory.join(&subscription).await?;
        Ok(Self::with_membership(factory, subscription, membership))
    }

    pub fn with_membership(
        factory: Arc<F>,
        subscription: GroupSubscription,
        membership: F::Membership,
    ) -> Self {
        Self {
            factory,
            subscription,
            current: Some(membership),
            generation: 1,
        }
    }

    /// The live membership, or `Closed` while the slot is empty.
    pub fn current(&mut self) -> Result<&mut F::Membership, ChannelError> {
        self.current.as_mut().ok_or(ChannelError::Closed)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Number of memberships this slot has held.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscription(&self) -> &GroupSubscription {
        &self.subscription
    }

    /// Close and drop the current membership, then join a new one.
    ///
    /// On a join error the slot stays empty and a later call retries the join.
    pub async fn replace(&mut self) -> Result<(), ChannelError> {
        self.discard().await;

        let membership = self.factory.join(&self.subscription).await?;
        self.current = Some(membership);
        self.generation += 1;

        debug!(generation = self.generation, "Installed new membership");
        Ok(())
    }

    /// Close and drop the current membership, leaving the slot empty.
    pub async fn discard(&mut self) {
        if let Some(mut old) = self.current.take() {
            if let Err(e) = old.close().await {
                warn!(error = %e, "Failed to close membership, discarding it anyway");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_channel::{InMemoryBroker, Publisher};

    fn subscription() -> GroupSubscription {
        GroupSubscription::new("orders", "processors").with_consumer_id("c1")
    }

    #[tokio::test]
    async fn test_replace_installs_fresh_membership() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut slot = MembershipSlot::join(broker.clone(), subscription()).await.unwrap();
        assert_eq!(slot.generation(), 1);

        broker.publish("orders", None, b"1").await.unwrap();
        let batch = slot.current().unwrap().next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);

        slot.replace().await.unwrap();
        assert_eq!(slot.generation(), 2);
        assert_eq!(broker.joins(), 2);

        // The uncommitted record moves to the new membership
        let redelivered = slot.current().unwrap().next_batch().await.unwrap().unwrap();
        assert_eq!(redelivered, batch);
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_slot_empty() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut slot = MembershipSlot::join(broker.clone(), subscription()).await.unwrap();

        broker.fail_next_joins(1);
        assert!(slot.replace().await.is_err());
        assert!(slot.is_empty());
        assert!(matches!(slot.current(), Err(ChannelError::Closed)));

        slot.replace().await.unwrap();
        assert!(!slot.is_empty());
        assert_eq!(slot.generation(), 2);
    }
}
