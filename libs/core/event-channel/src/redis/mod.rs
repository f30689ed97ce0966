//! Redis Streams backend.
//!
//! Topics map to streams and consumer groups map to Redis consumer groups.
//! Every read is a non-blocking poll; callers sleep `poll_interval_ms`
//! between empty polls.

mod config;
mod connector;
mod group;
mod publisher;
mod reader;

pub use config::BrokerConfig;
pub use connector::{connect, connect_with_retry};
pub use group::{RedisMembership, RedisMembershipFactory};
pub use publisher::RedisPublisher;
pub use reader::RedisStandaloneReader;

use crate::offset::Offset;
use crate::record::Record;
use tracing::warn;

/// Stream field carrying the record payload
pub(crate) const PAYLOAD_FIELD: &str = "payload";

/// Stream field carrying the optional record key
pub(crate) const KEY_FIELD: &str = "key";

/// Raw stream entries as returned by `XRANGE`, `XREVRANGE` and `XCLAIM`
pub(crate) type RawEntries = Vec<(String, Vec<(String, Vec<u8>)>)>;

/// Raw reply of `XREAD` / `XREADGROUP`: one element per stream
pub(crate) type RawStreams = Vec<(String, RawEntries)>;

/// Convert raw stream entries to records.
///
/// Entries with an unparseable ID are skipped. An entry without a payload
/// field is still delivered, with an empty payload, so consumers can decide
/// what to do with it.
pub(crate) fn parse_entries(topic: &str, entries: RawEntries) -> Vec<Record> {
    let mut records = Vec::with_capacity(entries.len());

    for (id, fields) in entries {
        let offset: Offset = match id.parse() {
            Ok(offset) => offset,
            Err(e) => {
                warn!(topic = %topic, entry_id = %id, error = %e, "Skipping entry with invalid ID");
                continue;
            }
        };

        let mut payload = None;
        let mut key = None;
        for (name, value) in fields {
            match name.as_str() {
                PAYLOAD_FIELD => payload = Some(value),
                KEY_FIELD => key = Some(String::from_utf8_lossy(&value).into_owned()),
                _ => {}
            }
        }

        if payload.is_none() {
            warn!(topic = %topic, entry_id = %id, "Missing 'payload' field in entry");
        }

        records.push(Record::new(topic, offset, key, payload.unwrap_or_default()));
    }

    records
}

/// Flatten an `XREAD`/`XREADGROUP` reply into records.
pub(crate) fn parse_streams(topic: &str, streams: RawStreams) -> Vec<Record> {
    streams
        .into_iter()
        .flat_map(|(_, entries)| parse_entries(topic, entries))
        .collect()
}

/// Read `connected_slaves` from an `INFO replication` reply.
pub(crate) fn parse_connected_replicas(info: &str) -> u64 {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("connected_slaves:"))
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries() {
        let entries = vec![
            (
                "1700000000000-0".to_string(),
                vec![
                    ("payload".to_string(), b"{\"id\":1}".to_vec()),
                    ("key".to_string(), b"order-1".to_vec()),
                ],
            ),
            ("bogus".to_string(), vec![("payload".to_string(), b"x".to_vec())]),
            ("1700000000000-1".to_string(), vec![("other".to_string(), b"y".to_vec())]),
        ];

        let records = parse_entries("orders", entries);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].offset, Offset::new(1_700_000_000_000, 0));
        assert_eq!(records[0].key.as_deref(), Some("order-1"));
        assert_eq!(records[0].payload, b"{\"id\":1}");
        assert!(records[1].payload.is_empty());
    }

    #[test]
    fn test_parse_streams() {
        let streams = vec![(
            "orders".to_string(),
            vec![("5-0".to_string(), vec![("payload".to_string(), b"a".to_vec())])],
        )];
        let records = parse_streams("orders", streams);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topic, "orders");
    }

    #[test]
    fn test_parse_connected_replicas() {
        let info = "# Replication\r\nrole:master\r\nconnected_slaves:2\r\nslave0:ip=10.0.0.2\r\n";
        assert_eq!(parse_connected_replicas(info), 2);
        assert_eq!(parse_connected_replicas("role:master\r\n"), 0);
    }
}
