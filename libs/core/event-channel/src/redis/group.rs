//! Consumer-group membership over Redis Streams.

use super::{RawStreams, parse_streams};
use crate::channel::{GroupMembership, MembershipFactory};
use crate::error::{ChannelError, is_busygroup};
use crate::metrics::ChannelMetrics;
use crate::offset::StartOffset;
use crate::record::Record;
use crate::subscription::GroupSubscription;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use tracing::{debug, info, warn};

/// Joins consumer groups; every join opens its own connection.
#[derive(Clone)]
pub struct RedisMembershipFactory {
    client: Client,
}

impl RedisMembershipFactory {
    pub fn new(url: &str) -> Result<Self, ChannelError> {
        let client = Client::open(url).map_err(|e| ChannelError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    async fn create_group(
        conn: &mut ConnectionManager,
        subscription: &GroupSubscription,
    ) -> Result<(), ChannelError> {
        let start = match subscription.start {
            StartOffset::Earliest => "0",
            StartOffset::Latest => "$",
        };

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&subscription.topic)
            .arg(&subscription.group)
            .arg(start)
            .arg("MKSTREAM")
            .query_async(conn)
            .await;

        match result {
            Ok(()) => {
                info!(
                    topic = %subscription.topic,
                    group = %subscription.group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if is_busygroup(&e.to_string()) => {
                debug!(group = %subscription.group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Take ownership of entries other consumers left pending for too long.
    async fn claim_abandoned(
        conn: &mut ConnectionManager,
        subscription: &GroupSubscription,
    ) -> Result<usize, ChannelError> {
        let pending: Vec<(String, String, u64, u64)> = redis::cmd("XPENDING")
            .arg(&subscription.topic)
            .arg(&subscription.group)
            .arg("-")
            .arg("+")
            .arg(subscription.batch_size * 10)
            .query_async(conn)
            .await
            .map_err(|e| {
                ChannelError::from_group_reply(e, &subscription.topic, &subscription.group)
            })?;

        let claim_ids: Vec<String> = pending
            .into_iter()
            .filter(|(_, consumer, idle_ms, _)| {
                consumer != &subscription.consumer_id && *idle_ms > subscription.claim_idle_ms
            })
            .map(|(id, _, _, _)| id)
            .collect();

        if claim_ids.is_empty() {
            return Ok(0);
        }

        // JUSTID moves ownership; the entries are then read back as our own pending
        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&subscription.topic)
            .arg(&subscription.group)
            .arg(&subscription.consumer_id)
            .arg(subscription.claim_idle_ms)
            .arg(&claim_ids)
            .arg("JUSTID");
        let claimed: Vec<String> = cmd.query_async(conn).await?;

        if !claimed.is_empty() {
            warn!(
                count = claimed.len(),
                group = %subscription.group,
                "Claimed abandoned entries"
            );
            ChannelMetrics::new(&subscription.topic)
                .records_claimed(&subscription.group, claimed.len());
        }

        Ok(claimed.len())
    }
}

#[async_trait]
impl MembershipFactory for RedisMembershipFactory {
    type Membership = RedisMembership;

    async fn join(&self, subscription: &GroupSubscription) -> Result<RedisMembership, ChannelError> {
        let mut conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| ChannelError::Connection(e.to_string()))?;

        Self::create_group(&mut conn, subscription).await?;
        Self::claim_abandoned(&mut conn, subscription).await?;

        let metrics = ChannelMetrics::new(&subscription.topic);
        metrics.group_joined(&subscription.group);

        info!(
            topic = %subscription.topic,
            group = %subscription.group,
            consumer = %subscription.consumer_id,
            "Joined consumer group"
        );

        Ok(RedisMembership {
            conn: Some(conn),
            subscription: subscription.clone(),
            pending_cursor: Some("0".to_string()),
            metrics,
        })
    }
}

/// A live consumer-group membership.
///
/// Reads its own pending entries first (entries delivered to this consumer
/// ID but never acknowledged), then switches to never-delivered entries.
pub struct RedisMembership {
    conn: Option<ConnectionManager>,
    subscription: GroupSubscription,
    /// Position in our pending list; `None` once it is drained
    pending_cursor: Option<String>,
    metrics: ChannelMetrics,
}

impl RedisMembership {
    async fn read_group(
        &self,
        conn: &mut ConnectionManager,
        from: &str,
    ) -> Result<Vec<Record>, ChannelError> {
        let sub = &self.subscription;

        let reply: Option<RawStreams> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&sub.group)
            .arg(&sub.consumer_id)
            .arg("COUNT")
            .arg(sub.batch_size)
            .arg("STREAMS")
            .arg(&sub.topic)
            .arg(from)
            .query_async(conn)
            .await
            .map_err(|e| ChannelError::from_group_reply(e, &sub.topic, &sub.group))?;

        Ok(reply
            .map(|streams| parse_streams(&sub.topic, streams))
            .unwrap_or_default())
    }
}

#[async_trait]
impl GroupMembership for RedisMembership {
    async fn next_batch(&mut self) -> Result<Option<Vec<Record>>, ChannelError> {
        loop {
            let mut conn = self.conn.clone().ok_or(ChannelError::Closed)?;

            let batch = match self.pending_cursor.clone() {
                Some(cursor) => {
                    let batch = self.read_group(&mut conn, &cursor).await?;
                    match batch.last() {
                        Some(last) => self.pending_cursor = Some(last.offset.to_string()),
                        None => {
                            debug!(consumer = %self.subscription.consumer_id, "Pending entries drained");
                            self.pending_cursor = None;
                        }
                    }
                    batch
                }
                None => self.read_group(&mut conn, ">").await?,
            };

            if !batch.is_empty() {
                self.metrics
                    .records_delivered(&self.subscription.group, batch.len());
                return Ok(Some(batch));
            }

            if self.pending_cursor.is_none() {
                tokio::time::sleep(self.subscription.poll_interval()).await;
            }
        }
    }

    async fn commit(&mut self, record: &Record) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone().ok_or(ChannelError::Closed)?;

        let _: i64 = redis::cmd("XACK")
            .arg(&self.subscription.topic)
            .arg(&self.subscription.group)
            .arg(record.offset.to_string())
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                ChannelError::from_group_reply(e, &self.subscription.topic, &self.subscription.group)
            })?;

        self.metrics.record_committed(&self.subscription.group);
        debug!(offset = %record.offset, "Committed record");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if self.conn.take().is_some() {
            debug!(
                group = %self.subscription.group,
                consumer = %self.subscription.consumer_id,
                "Closed membership"
            );
        }
        Ok(())
    }
}
