//! In-memory event channel.
//!
//! Mirrors the Redis backend's semantics closely enough to drive the whole
//! pipeline in tests: a per-group delivery cursor, a pending set of delivered
//! but uncommitted records, and redelivery of that pending set to the next
//! membership that joins the group. Fault injection hooks let tests break
//! publishes, joins, polls, commits and claims on demand.

use crate::channel::{GroupMembership, MembershipFactory, Publisher, StandaloneReader};
use crate::error::ChannelError;
use crate::offset::{Offset, StartOffset};
use crate::record::{Ack, Record};
use crate::subscription::GroupSubscription;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Default)]
struct GroupState {
    /// Index of the next never-delivered record
    cursor: usize,
    /// Delivered but uncommitted records, by index
    pending: BTreeMap<usize, String>,
    committed: Vec<Offset>,
}

#[derive(Default)]
struct State {
    topics: HashMap<String, Vec<Record>>,
    groups: HashMap<(String, String), GroupState>,
    last_offset: Offset,
    claim_epoch: u64,
    joins: u32,
    fail_publishes: u32,
    reject_publishes: u32,
    fail_joins: u32,
    fail_polls: u32,
    fail_commits: u32,
    fail_reads: u32,
}

impl State {
    fn next_offset(&mut self) -> Offset {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let next = if now > self.last_offset.millis {
            Offset::new(now, 0)
        } else {
            Offset::new(self.last_offset.millis, self.last_offset.sequence + 1)
        };
        self.last_offset = next;
        next
    }

    fn topic_len(&self, topic: &str) -> usize {
        self.topics.get(topic).map(Vec::len).unwrap_or(0)
    }
}

struct Inner {
    state: Mutex<State>,
    changed: watch::Sender<u64>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake(&self) {
        self.changed.send_modify(|v| *v = v.wrapping_add(1));
    }
}

/// Shared in-memory broker. Clones share the same topics and groups.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                changed,
            }),
        }
    }

    /// Fail the next `n` publishes with a transient error
    pub fn fail_next_publishes(&self, n: u32) {
        self.inner.lock().fail_publishes = n;
    }

    /// Reject the next `n` publishes with a permanent error
    pub fn reject_next_publishes(&self, n: u32) {
        self.inner.lock().reject_publishes = n;
    }

    /// Fail the next `n` group joins
    pub fn fail_next_joins(&self, n: u32) {
        self.inner.lock().fail_joins = n;
    }

    /// Fail the next `n` group polls
    pub fn fail_next_polls(&self, n: u32) {
        self.inner.lock().fail_polls = n;
        self.inner.wake();
    }

    /// Fail the next `n` commits
    pub fn fail_next_commits(&self, n: u32) {
        self.inner.lock().fail_commits = n;
    }

    /// Fail the next `n` standalone reads
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.lock().fail_reads = n;
        self.inner.wake();
    }

    /// End the current claim of every live membership, as a rebalance would
    pub fn end_claims(&self) {
        self.inner.lock().claim_epoch += 1;
        self.inner.wake();
    }

    /// All records appended to `topic`, oldest first
    pub fn records(&self, topic: &str) -> Vec<Record> {
        self.inner
            .lock()
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Delivered but uncommitted records for a group
    pub fn pending_count(&self, topic: &str, group: &str) -> usize {
        self.inner
            .lock()
            .groups
            .get(&(topic.to_string(), group.to_string()))
            .map(|g| g.pending.len())
            .unwrap_or(0)
    }

    /// Offsets committed by a group, in commit order
    pub fn committed(&self, topic: &str, group: &str) -> Vec<Offset> {
        self.inner
            .lock()
            .groups
            .get(&(topic.to_string(), group.to_string()))
            .map(|g| g.committed.clone())
            .unwrap_or_default()
    }

    /// Number of successful group joins
    pub fn joins(&self) -> u32 {
        self.inner.lock().joins
    }

    /// Open a standalone reader on `topic`
    pub fn reader(&self, topic: impl Into<String>, start: StartOffset) -> InMemoryReader {
        let topic = topic.into();
        let position = match start {
            StartOffset::Earliest => 0,
            StartOffset::Latest => self.inner.lock().topic_len(&topic),
        };

        InMemoryReader {
            inner: self.inner.clone(),
            changed: self.inner.changed.subscribe(),
            topic,
            position,
        }
    }
}

#[async_trait]
impl Publisher for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
    ) -> Result<Ack, ChannelError> {
        let ack = {
            let mut state = self.inner.lock();

            if state.reject_publishes > 0 {
                state.reject_publishes -= 1;
                return Err(ChannelError::Config(format!("topic '{}' rejected write", topic)));
            }
            if state.fail_publishes > 0 {
                state.fail_publishes -= 1;
                return Err(ChannelError::Injected("publish".to_string()));
            }

            let offset = state.next_offset();
            let record = Record::new(topic, offset, key.map(str::to_string), value.to_vec());
            state.topics.entry(topic.to_string()).or_default().push(record);

            Ack {
                topic: topic.to_string(),
                offset,
            }
        };

        debug!(topic = %topic, offset = %ack.offset, "Appended record");
        self.inner.wake();
        Ok(ack)
    }
}

#[async_trait]
impl MembershipFactory for InMemoryBroker {
    type Membership = InMemoryMembership;

    async fn join(&self, subscription: &GroupSubscription) -> Result<InMemoryMembership, ChannelError> {
        let mut state = self.inner.lock();

        if state.fail_joins > 0 {
            state.fail_joins -= 1;
            return Err(ChannelError::Injected("join".to_string()));
        }

        let topic_len = state.topic_len(&subscription.topic);
        let group = state
            .groups
            .entry((subscription.topic.clone(), subscription.group.clone()))
            .or_insert_with(|| GroupState {
                cursor: match subscription.start {
                    StartOffset::Earliest => 0,
                    StartOffset::Latest => topic_len,
                },
                ..GroupState::default()
            });

        // The new member takes over everything left pending by earlier members
        let redeliver: VecDeque<usize> = group.pending.keys().copied().collect();
        for owner in group.pending.values_mut() {
            *owner = subscription.consumer_id.clone();
        }

        state.joins += 1;
        let epoch = state.claim_epoch;

        debug!(
            topic = %subscription.topic,
            group = %subscription.group,
            consumer = %subscription.consumer_id,
            redeliver = redeliver.len(),
            "Joined consumer group"
        );

        Ok(InMemoryMembership {
            inner: self.inner.clone(),
            changed: self.inner.changed.subscribe(),
            topic: subscription.topic.clone(),
            group: subscription.group.clone(),
            consumer_id: subscription.consumer_id.clone(),
            batch_size: subscription.batch_size.max(1),
            redeliver,
            epoch,
            closed: false,
        })
    }
}

/// A consumer-group membership on an [`InMemoryBroker`]
pub struct InMemoryMembership {
    inner: Arc<Inner>,
    changed: watch::Receiver<u64>,
    topic: String,
    group: String,
    consumer_id: String,
    batch_size: usize,
    redeliver: VecDeque<usize>,
    epoch: u64,
    closed: bool,
}

impl InMemoryMembership {
    /// Take the next batch if one is ready; `Ok(Some(vec![]))` means nothing yet.
    fn poll_batch(&mut self) -> Result<Option<Vec<Record>>, ChannelError> {
        let mut state = self.inner.lock();

        if state.fail_polls > 0 {
            state.fail_polls -= 1;
            return Err(ChannelError::Injected("poll".to_string()));
        }

        if state.claim_epoch != self.epoch {
            self.epoch = state.claim_epoch;
            return Ok(None);
        }

        let State { topics, groups, .. } = &mut *state;
        let records = topics.get(&self.topic).map(Vec::as_slice).unwrap_or(&[]);
        let group = groups
            .get_mut(&(self.topic.clone(), self.group.clone()))
            .ok_or_else(|| ChannelError::GroupMissing {
                topic: self.topic.clone(),
                group: self.group.clone(),
            })?;

        let mut batch = Vec::new();

        while batch.len() < self.batch_size {
            let Some(index) = self.redeliver.pop_front() else {
                break;
            };
            // Skip entries committed since the join
            if group.pending.contains_key(&index) {
                batch.push(records[index].clone());
            }
        }

        while batch.len() < self.batch_size && group.cursor < records.len() {
            let index = group.cursor;
            group.cursor += 1;
            group.pending.insert(index, self.consumer_id.clone());
            batch.push(records[index].clone());
        }

        Ok(Some(batch))
    }
}

#[async_trait]
impl GroupMembership for InMemoryMembership {
    async fn next_batch(&mut self) -> Result<Option<Vec<Record>>, ChannelError> {
        loop {
            if self.closed {
                return Err(ChannelError::Closed);
            }

            self.changed.borrow_and_update();
            match self.poll_batch()? {
                Some(batch) if batch.is_empty() => {}
                other => return Ok(other),
            }

            // The sender lives in `inner`, which this handle keeps alive
            if self.changed.changed().await.is_err() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }

    async fn commit(&mut self, record: &Record) -> Result<(), ChannelError> {
        if self.closed {
            return Err(ChannelError::Closed);
        }

        let mut state = self.inner.lock();

        if state.fail_commits > 0 {
            state.fail_commits -= 1;
            return Err(ChannelError::Injected("commit".to_string()));
        }

        let State { topics, groups, .. } = &mut *state;
        let index = topics
            .get(&self.topic)
            .and_then(|records| records.iter().position(|r| r.offset == record.offset));

        if let (Some(index), Some(group)) = (
            index,
            groups.get_mut(&(self.topic.clone(), self.group.clone())),
        ) {
            if group.pending.remove(&index).is_some() {
                group.committed.push(record.offset);
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if !self.closed {
            self.closed = true;
            debug!(
                topic = %self.topic,
                group = %self.group,
                consumer = %self.consumer_id,
                "Closed membership"
            );
        }
        Ok(())
    }
}

/// A standalone reader on an [`InMemoryBroker`]
pub struct InMemoryReader {
    inner: Arc<Inner>,
    changed: watch::Receiver<u64>,
    topic: String,
    position: usize,
}

#[async_trait]
impl StandaloneReader for InMemoryReader {
    async fn next(&mut self) -> Result<Record, ChannelError> {
        loop {
            self.changed.borrow_and_update();

            {
                let mut state = self.inner.lock();

                if state.fail_reads > 0 {
                    state.fail_reads -= 1;
                    return Err(ChannelError::Injected("read".to_string()));
                }

                if let Some(record) = state
                    .topics
                    .get(&self.topic)
                    .and_then(|records| records.get(self.position))
                {
                    self.position += 1;
                    return Ok(record.clone());
                }
            }

            if self.changed.changed().await.is_err() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(consumer: &str) -> GroupSubscription {
        GroupSubscription::new("orders", "processors").with_consumer_id(consumer)
    }

    #[tokio::test]
    async fn test_publish_assigns_increasing_offsets() {
        let broker = InMemoryBroker::new();
        let a = broker.publish("orders", None, b"a").await.unwrap();
        let b = broker.publish("orders", Some("k"), b"b").await.unwrap();

        assert!(a.offset < b.offset);
        let records = broker.records("orders");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_injected_publish_failures() {
        let broker = InMemoryBroker::new();
        broker.fail_next_publishes(1);
        broker.reject_next_publishes(1);

        let rejected = broker.publish("orders", None, b"x").await.unwrap_err();
        assert!(!rejected.is_transient());
        let failed = broker.publish("orders", None, b"x").await.unwrap_err();
        assert!(failed.is_transient());
        assert!(broker.publish("orders", None, b"x").await.is_ok());
    }

    #[tokio::test]
    async fn test_group_delivers_and_commits() {
        let broker = InMemoryBroker::new();
        broker.publish("orders", None, b"1").await.unwrap();
        broker.publish("orders", None, b"2").await.unwrap();

        let mut member = broker.join(&subscription("c1")).await.unwrap();
        let batch = member.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(broker.pending_count("orders", "processors"), 2);

        for record in &batch {
            member.commit(record).await.unwrap();
        }
        assert_eq!(broker.pending_count("orders", "processors"), 0);
        assert_eq!(broker.committed("orders", "processors").len(), 2);
    }

    #[tokio::test]
    async fn test_new_membership_redelivers_pending() {
        let broker = InMemoryBroker::new();
        broker.publish("orders", None, b"1").await.unwrap();
        broker.publish("orders", None, b"2").await.unwrap();

        let mut first = broker.join(&subscription("c1")).await.unwrap();
        let batch = first.next_batch().await.unwrap().unwrap();
        first.commit(&batch[0]).await.unwrap();
        first.close().await.unwrap();
        assert!(matches!(first.next_batch().await, Err(ChannelError::Closed)));

        let mut second = broker.join(&subscription("c2")).await.unwrap();
        let redelivered = second.next_batch().await.unwrap().unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].payload, b"2");
        assert_eq!(broker.joins(), 2);
    }

    #[tokio::test]
    async fn test_latest_group_skips_existing_records() {
        let broker = InMemoryBroker::new();
        broker.publish("orders", None, b"old").await.unwrap();

        let mut member = broker
            .join(&subscription("c1").with_start(StartOffset::Latest))
            .await
            .unwrap();
        broker.publish("orders", None, b"new").await.unwrap();

        let batch = member.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].payload, b"new");
    }

    #[tokio::test]
    async fn test_end_claims_yields_none_once() {
        let broker = InMemoryBroker::new();
        let mut member = broker.join(&subscription("c1")).await.unwrap();

        broker.end_claims();
        assert!(member.next_batch().await.unwrap().is_none());

        broker.publish("orders", None, b"1").await.unwrap();
        assert_eq!(member.next_batch().await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_join_poll_and_commit_failures() {
        let broker = InMemoryBroker::new();
        broker.fail_next_joins(1);
        assert!(broker.join(&subscription("c1")).await.is_err());

        let mut member = broker.join(&subscription("c1")).await.unwrap();
        broker.fail_next_polls(1);
        assert!(member.next_batch().await.is_err());

        broker.publish("orders", None, b"1").await.unwrap();
        let batch = member.next_batch().await.unwrap().unwrap();
        broker.fail_next_commits(1);
        assert!(member.commit(&batch[0]).await.is_err());
        assert_eq!(broker.pending_count("orders", "processors"), 1);
    }

    #[tokio::test]
    async fn test_reader_waits_for_new_records() {
        let broker = InMemoryBroker::new();
        let mut reader = broker.reader("orders", StartOffset::Earliest);

        let publisher = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish("orders", None, b"late").await.unwrap();
        });

        let record = reader.next().await.unwrap();
        assert_eq!(record.payload, b"late");
    }

    #[tokio::test]
    async fn test_reader_is_cancel_safe() {
        let broker = InMemoryBroker::new();
        let mut reader = broker.reader("orders", StartOffset::Earliest);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), reader.next()).await;
        assert!(timed_out.is_err());

        broker.publish("orders", None, b"1").await.unwrap();
        assert_eq!(reader.next().await.unwrap().payload, b"1");
    }

    #[tokio::test]
    async fn test_reader_latest_start() {
        let broker = InMemoryBroker::new();
        broker.publish("orders", None, b"old").await.unwrap();

        let mut reader = broker.reader("orders", StartOffset::Latest);
        broker.publish("orders", None, b"new").await.unwrap();
        assert_eq!(reader.next().await.unwrap().payload, b"new");
    }
}
