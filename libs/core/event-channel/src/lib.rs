//! Event Channel
//!
//! A partitioned-log event channel with a deliberately narrow interface:
//!
//! - **Publisher**: append a record to a topic with a configurable durability level
//! - **Consumer groups**: join, poll batches, commit offsets, close; every join
//!   yields a fresh membership handle
//! - **Standalone readers**: read a topic from the earliest or latest offset with
//!   no group coordination
//!
//! Two backends implement it: Redis Streams ([`redis`]) for deployments and
//! [`InMemoryBroker`] for tests.
//!
//! ## Example
//!
//! ```ignore
//! use event_channel::{GroupSubscription, MembershipFactory, GroupMembership};
//! use event_channel::redis::RedisMembershipFactory;
//!
//! let factory = RedisMembershipFactory::new("redis://127.0.0.1:6379")?;
//! let mut membership = factory.join(&GroupSubscription::new("orders", "processors")).await?;
//! while let Some(batch) = membership.next_batch().await? {
//!     for record in &batch {
//!         membership.commit(record).await?;
//!     }
//! }
//! ```

mod channel;
mod error;
mod memory;
pub mod metrics;
mod offset;
mod record;
pub mod redis;
mod retry;
mod subscription;
mod topic;

pub use channel::{GroupMembership, MembershipFactory, Publisher, StandaloneReader};
pub use error::ChannelError;
pub use memory::{InMemoryBroker, InMemoryMembership, InMemoryReader};
pub use metrics::{ChannelMetrics, init_metrics, render_metrics};
pub use offset::{Offset, StartOffset};
pub use record::{Ack, Record};
pub use retry::{RetryConfig, retry_with_backoff, retry_with_backoff_if};
pub use subscription::{AckLevel, GroupSubscription};
pub use topic::TopicDef;
