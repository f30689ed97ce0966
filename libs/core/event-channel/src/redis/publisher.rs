use super::{KEY_FIELD, PAYLOAD_FIELD, parse_connected_replicas};
use crate::channel::Publisher;
use crate::error::ChannelError;
use crate::metrics::ChannelMetrics;
use crate::offset::Offset;
use crate::record::Ack;
use crate::subscription::AckLevel;
use crate::topic::TopicDef;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

/// Publishes records with `XADD`, then waits for replicas when required.
///
/// With [`AckLevel::AllReplicas`] the publish only succeeds once every
/// replica currently connected to the primary has acknowledged the write
/// (`WAIT`). A primary with no replicas acknowledges on its own.
#[derive(Clone)]
pub struct RedisPublisher {
    conn: ConnectionManager,
    ack_level: AckLevel,
    max_length: i64,
}

impl RedisPublisher {
    pub fn new(conn: ConnectionManager, ack_level: AckLevel) -> Self {
        Self {
            conn,
            ack_level,
            max_length: 100_000,
        }
    }

    /// Use the retention of a `TopicDef`.
    pub fn for_topic<T: TopicDef>(conn: ConnectionManager, ack_level: AckLevel) -> Self {
        Self::new(conn, ack_level).with_max_length(T::MAX_LENGTH)
    }

    /// Set the approximate stream length (`MAXLEN ~`).
    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    async fn wait_for_replicas(&self, timeout_ms: u64) -> Result<(), ChannelError> {
        let mut conn = self.conn.clone();

        let info: String = redis::cmd("INFO")
            .arg("replication")
            .query_async(&mut conn)
            .await?;
        let required = parse_connected_replicas(&info);
        if required == 0 {
            return Ok(());
        }

        let acknowledged: u64 = redis::cmd("WAIT")
            .arg(required)
            .arg(timeout_ms)
            .query_async(&mut conn)
            .await?;

        if acknowledged < required {
            warn!(required, acknowledged, "Replicas did not acknowledge write in time");
            return Err(ChannelError::AckTimeout {
                required,
                acknowledged,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Publisher for RedisPublisher {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &[u8],
    ) -> Result<Ack, ChannelError> {
        let mut conn = self.conn.clone();

        let mut cmd = redis::cmd("XADD");
        cmd.arg(topic)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(value);
        if let Some(key) = key {
            cmd.arg(KEY_FIELD).arg(key);
        }

        let entry_id: String = cmd.query_async(&mut conn).await?;
        let offset: Offset = entry_id.parse()?;

        if let AckLevel::AllReplicas { timeout_ms } = self.ack_level {
            self.wait_for_replicas(timeout_ms).await?;
        }

        ChannelMetrics::new(topic).record_appended();
        debug!(topic = %topic, offset = %offset, "Appended record");

        Ok(Ack {
            topic: topic.to_string(),
            offset,
        })
    }
}
