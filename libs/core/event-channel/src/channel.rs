//! The narrow interface every event-channel backend implements.
//!
//! - [`Publisher`] appends records to a topic.
//! - [`MembershipFactory`] joins a consumer group, yielding a [`GroupMembership`].
//! - [`StandaloneReader`] reads a topic with no group coordination.

use crate::error::ChannelError;
use crate::record::{Ack, Record};
use crate::subscription::GroupSubscription;
use async_trait::async_trait;

/// Appends records to a topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `value` to `topic`, returning once the configured durability is met.
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
    ) -> Result<Ack, ChannelError>;
}

/// Constructs brand-new consumer-group memberships.
///
/// Every call to [`join`](MembershipFactory::join) yields an independent
/// handle; a failed membership is discarded and replaced, never reused.
#[async_trait]
pub trait MembershipFactory: Send + Sync + 'static {
    type Membership: GroupMembership;

    async fn join(&self, subscription: &GroupSubscription)
    -> Result<Self::Membership, ChannelError>;
}

/// One live membership in a consumer group.
#[async_trait]
pub trait GroupMembership: Send + 'static {
    /// Wait for the next batch of claimed records.
    ///
    /// `Ok(None)` means the claim ended (rebalance or revocation) and the
    /// caller should re-enter consumption.
    async fn next_batch(&mut self) -> Result<Option<Vec<Record>>, ChannelError>;

    /// Mark the record's offset as committed for the group.
    async fn commit(&mut self, record: &Record) -> Result<(), ChannelError>;

    /// Release the membership. Later calls on the handle return [`ChannelError::Closed`].
    async fn close(&mut self) -> Result<(), ChannelError>;
}

/// Reads a topic without group coordination; offsets are tracked internally.
#[async_trait]
pub trait StandaloneReader: Send {
    /// Wait for the next record.
    ///
    /// Cancel-safe: dropping the returned future never loses a record.
    async fn next(&mut self) -> Result<Record, ChannelError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
    ) -> Result<Ack, ChannelError> {
        (**self).publish(topic, key, value).await
    }
}
