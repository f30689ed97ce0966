//! Topic definitions.

/// Topic definition trait.
///
/// Each domain implements this trait to pin its topic name, default consumer
/// group and retention in one place, so producers and consumers agree.
///
/// # Example
///
/// ```rust,ignore
/// use event_channel::TopicDef;
///
/// pub struct OrdersTopic;
///
/// impl TopicDef for OrdersTopic {
///     const TOPIC_NAME: &'static str = "orders";
///     const CONSUMER_GROUP: &'static str = "order-processors";
/// }
/// ```
pub trait TopicDef: Send + Sync + 'static {
    /// Topic (Redis stream key) name
    const TOPIC_NAME: &'static str;

    /// Default consumer group
    const CONSUMER_GROUP: &'static str;

    /// Approximate retention in records (`XADD MAXLEN ~`)
    const MAX_LENGTH: i64 = 100_000;

    /// Records fetched per poll
    const BATCH_SIZE: usize = 10;

    /// Sleep between polls that return nothing
    const POLL_INTERVAL_MS: u64 = 500;

    /// Pending entries idle longer than this are claimed from other consumers
    const CLAIM_IDLE_MS: u64 = 30_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AuditTopic;

    impl TopicDef for AuditTopic {
        const TOPIC_NAME: &'static str = "audit";
        const CONSUMER_GROUP: &'static str = "auditors";
        const BATCH_SIZE: usize = 50;
    }

    #[test]
    fn test_defaults_and_overrides() {
        assert_eq!(AuditTopic::TOPIC_NAME, "audit");
        assert_eq!(AuditTopic::MAX_LENGTH, 100_000);
        assert_eq!(AuditTopic::BATCH_SIZE, 50);
        assert_eq!(AuditTopic::POLL_INTERVAL_MS, 500);
    }
}
