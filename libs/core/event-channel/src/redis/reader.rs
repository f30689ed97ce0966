use super::{RawEntries, RawStreams, parse_entries, parse_streams};
use crate::channel::StandaloneReader;
use crate::error::ChannelError;
use crate::offset::StartOffset;
use crate::record::Record;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// Reads a single stream with `XREAD`, tracking the last seen entry ID locally.
pub struct RedisStandaloneReader {
    conn: ConnectionManager,
    topic: String,
    last_id: String,
    buffer: VecDeque<Record>,
    batch_size: usize,
    poll_interval: Duration,
}

impl RedisStandaloneReader {
    /// Open a reader; `Latest` resolves the current last entry up front.
    pub async fn open(
        conn: ConnectionManager,
        topic: impl Into<String>,
        start: StartOffset,
    ) -> Result<Self, ChannelError> {
        let topic = topic.into();
        let mut reader = Self {
            conn,
            topic,
            last_id: "0".to_string(),
            buffer: VecDeque::new(),
            batch_size: 10,
            poll_interval: Duration::from_millis(500),
        };

        if start == StartOffset::Latest {
            let mut conn = reader.conn.clone();
            let newest: RawEntries = redis::cmd("XREVRANGE")
                .arg(&reader.topic)
                .arg("+")
                .arg("-")
                .arg("COUNT")
                .arg(1)
                .query_async(&mut conn)
                .await?;

            if let Some(last) = parse_entries(&reader.topic, newest).pop() {
                reader.last_id = last.offset.to_string();
            }
        }

        debug!(topic = %reader.topic, from = %reader.last_id, "Opened standalone reader");
        Ok(reader)
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn fetch(&mut self) -> Result<usize, ChannelError> {
        let mut conn = self.conn.clone();

        let reply: Option<RawStreams> = redis::cmd("XREAD")
            .arg("COUNT")
            .arg(self.batch_size)
            .arg("STREAMS")
            .arg(&self.topic)
            .arg(&self.last_id)
            .query_async(&mut conn)
            .await?;

        // Nothing below awaits, so a cancelled read never skips entries
        let records = reply
            .map(|streams| parse_streams(&self.topic, streams))
            .unwrap_or_default();
        if let Some(last) = records.last() {
            self.last_id = last.offset.to_string();
        }
        let fetched = records.len();
        self.buffer.extend(records);
        Ok(fetched)
    }
}

#[async_trait]
impl StandaloneReader for RedisStandaloneReader {
    async fn next(&mut self) -> Result<Record, ChannelError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(record);
            }

            if self.fetch().await? == 0 {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }
}
