//! Subscription and publish settings
//!
//! This module provides `GroupSubscription` for consumer-group membership
//! and `AckLevel` for publish durability.

use crate::offset::StartOffset;
use crate::topic::TopicDef;
use std::time::Duration;
use uuid::Uuid;

/// Settings for joining a consumer group
#[derive(Debug, Clone)]
pub struct GroupSubscription {
    /// Topic to consume
    pub topic: String,

    /// Consumer group name
    pub group: String,

    /// Consumer identity within the group (auto-generated if not provided)
    pub consumer_id: String,

    /// Where the group starts when it does not exist yet
    pub start: StartOffset,

    /// Records fetched per poll
    pub batch_size: usize,

    /// Sleep between polls that return nothing
    pub poll_interval_ms: u64,

    /// Pending entries idle longer than this are claimed on join
    pub claim_idle_ms: u64,
}

impl GroupSubscription {
    pub fn new(topic: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group: group.into(),
            consumer_id: format!("consumer-{}", Uuid::new_v4()),
            start: StartOffset::Earliest,
            batch_size: 10,
            poll_interval_ms: 500,
            claim_idle_ms: 30_000,
        }
    }

    /// Create a subscription from a `TopicDef`
    pub fn from_topic_def<T: TopicDef>() -> Self {
        Self {
            batch_size: T::BATCH_SIZE,
            poll_interval_ms: T::POLL_INTERVAL_MS,
            claim_idle_ms: T::CLAIM_IDLE_MS,
            ..Self::new(T::TOPIC_NAME, T::CONSUMER_GROUP)
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_start(mut self, start: StartOffset) -> Self {
        self.start = start;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = interval;
        self
    }

    pub fn with_claim_idle_ms(mut self, idle: u64) -> Self {
        self.claim_idle_ms = idle;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Durability required before a publish is acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckLevel {
    /// The primary has appended the record
    Leader,
    /// Every currently connected replica has acknowledged the write
    AllReplicas { timeout_ms: u64 },
}

impl Default for AckLevel {
    fn default() -> Self {
        AckLevel::AllReplicas { timeout_ms: 5000 }
    }
}
