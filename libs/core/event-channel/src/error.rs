//! Event channel error types
//!
//! Errors are split into two families:
//! - **Transient**: transport or coordination failures that a caller may retry
//!   (connection drops, lost consumer group, replica acknowledgment timeouts)
//! - **Permanent**: misuse or malformed data that retrying cannot fix

use thiserror::Error;

/// Event channel errors
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Redis connection or command error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Could not reach the broker
    #[error("Connection error: {0}")]
    Connection(String),

    /// The consumer group no longer exists on the broker
    #[error("Consumer group '{group}' missing on topic '{topic}'")]
    GroupMissing { topic: String, group: String },

    /// Fewer replicas acknowledged a write than were required
    #[error("Write acknowledged by {acknowledged} of {required} replicas")]
    AckTimeout { required: u64, acknowledged: u64 },

    /// The handle was closed and cannot be used again
    #[error("Channel handle closed")]
    Closed,

    /// Failure injected by the in-memory broker
    #[error("Injected failure: {0}")]
    Injected(String),

    /// An offset string could not be parsed
    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    /// Invalid channel configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChannelError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::Redis(_)
            | ChannelError::Connection(_)
            | ChannelError::GroupMissing { .. }
            | ChannelError::AckTimeout { .. }
            | ChannelError::Injected(_) => true,
            ChannelError::Closed | ChannelError::InvalidOffset(_) | ChannelError::Config(_) => {
                false
            }
        }
    }

    /// Map a Redis reply carrying `NOGROUP` to [`ChannelError::GroupMissing`].
    pub(crate) fn from_group_reply(err: redis::RedisError, topic: &str, group: &str) -> Self {
        if is_nogroup(&err.to_string()) {
            ChannelError::GroupMissing {
                topic: topic.to_string(),
                group: group.to_string(),
            }
        } else {
            ChannelError::Redis(err)
        }
    }
}

/// Redis reports a missing stream or group with a `NOGROUP` reply.
pub(crate) fn is_nogroup(message: &str) -> bool {
    message.contains("NOGROUP")
}

/// Redis reports an existing group on `XGROUP CREATE` with a `BUSYGROUP` reply.
pub(crate) fn is_busygroup(message: &str) -> bool {
    message.contains("BUSYGROUP")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ChannelError::Connection("refused".into()).is_transient());
        assert!(ChannelError::Injected("boom".into()).is_transient());
        assert!(
            ChannelError::AckTimeout {
                required: 2,
                acknowledged: 1
            }
            .is_transient()
        );
        assert!(
            ChannelError::GroupMissing {
                topic: "orders".into(),
                group: "g".into()
            }
            .is_transient()
        );

        assert!(!ChannelError::Closed.is_transient());
        assert!(!ChannelError::InvalidOffset("x".into()).is_transient());
        assert!(!ChannelError::Config("bad".into()).is_transient());
    }

    #[test]
    fn test_group_reply_detection() {
        assert!(is_nogroup(
            "NOGROUP: No such key 'orders' or consumer group 'g' in XREADGROUP"
        ));
        assert!(!is_nogroup("ERR syntax error"));
        assert!(is_busygroup("BUSYGROUP Consumer Group name already exists"));
    }

    #[test]
    fn test_group_missing_display() {
        let err = ChannelError::GroupMissing {
            topic: "orders".into(),
            group: "order-processors".into(),
        };
        assert!(err.to_string().contains("orders"));
        assert!(err.to_string().contains("order-processors"));
    }
}
