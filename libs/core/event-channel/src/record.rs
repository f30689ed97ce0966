//! Delivered records and publish acknowledgments

use crate::offset::Offset;
use chrono::{DateTime, Utc};

/// A record delivered from a topic
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Topic the record was read from
    pub topic: String,

    /// Position within the topic
    pub offset: Offset,

    /// Optional partition key supplied by the publisher
    pub key: Option<String>,

    /// Raw payload bytes
    pub payload: Vec<u8>,

    /// When the record was appended (derived from the offset)
    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(
        topic: impl Into<String>,
        offset: Offset,
        key: Option<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            topic: topic.into(),
            timestamp: offset.timestamp(),
            offset,
            key,
            payload,
        }
    }

    /// Payload as UTF-8, lossy, for logging
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// How long ago the record was appended
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.timestamp
    }
}

/// Acknowledgment of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub topic: String,
    pub offset: Offset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_timestamp_from_offset() {
        let record = Record::new("orders", Offset::new(1_700_000_000_000, 0), None, vec![]);
        assert_eq!(record.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert!(record.age().num_seconds() > 0);
    }

    #[test]
    fn test_payload_lossy() {
        let record = Record::new(
            "orders",
            Offset::default(),
            Some("k".into()),
            b"{\"id\":1}".to_vec(),
        );
        assert_eq!(record.payload_lossy(), "{\"id\":1}");
        assert_eq!(record.key.as_deref(), Some("k"));
    }
}
