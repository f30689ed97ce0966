//! Positions within a topic.

use crate::error::ChannelError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Totally ordered position of a record within a topic.
///
/// The text form is `"<millis>-<sequence>"`, the same shape as a Redis
/// stream entry ID, so the Redis backend can round-trip it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Offset {
    pub millis: u64,
    pub sequence: u64,
}

impl Offset {
    pub const fn new(millis: u64, sequence: u64) -> Self {
        Self { millis, sequence }
    }

    /// Wall-clock time encoded in the offset, or now when it is out of range.
    pub fn timestamp(&self) -> DateTime<Utc> {
        i64::try_from(self.millis)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.millis, self.sequence)
    }
}

impl FromStr for Offset {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChannelError::InvalidOffset(s.to_string());

        let (millis, sequence) = match s.split_once('-') {
            Some((millis, sequence)) => (millis, sequence),
            // Redis accepts a bare millisecond ID and implies sequence 0
            None => (s, "0"),
        };

        Ok(Self {
            millis: millis.parse().map_err(|_| invalid())?,
            sequence: sequence.parse().map_err(|_| invalid())?,
        })
    }
}

/// Where a new subscription begins reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOffset {
    /// From the oldest retained record
    #[default]
    Earliest,
    /// Only records published after the subscription starts
    Latest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_redis_entry_id() {
        let offset: Offset = "1700000000000-3".parse().unwrap();
        assert_eq!(offset, Offset::new(1_700_000_000_000, 3));
        assert_eq!(offset.to_string(), "1700000000000-3");
    }

    #[test]
    fn test_parse_bare_millis() {
        let offset: Offset = "42".parse().unwrap();
        assert_eq!(offset, Offset::new(42, 0));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("abc-1".parse::<Offset>().is_err());
        assert!("1-".parse::<Offset>().is_err());
        assert!("".parse::<Offset>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Offset::new(1, 9) < Offset::new(2, 0));
        assert!(Offset::new(5, 1) < Offset::new(5, 2));
    }

    #[test]
    fn test_timestamp_from_millis() {
        let offset = Offset::new(1_700_000_000_000, 0);
        assert_eq!(offset.timestamp().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_default_start_is_earliest() {
        assert_eq!(StartOffset::default(), StartOffset::Earliest);
    }
}
