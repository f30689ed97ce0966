//! Order model and topic definition.

use event_channel::TopicDef;
use serde::{Deserialize, Serialize};

/// The only status the pipeline acts on.
pub const PROCESSED_STATUS: &str = "processed";

/// An order event as carried on the `orders` topic.
///
/// Serialized as a flat JSON object, `{"id": 1, "status": "processed"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: String,
}

impl Order {
    pub fn new(id: i64, status: impl Into<String>) -> Self {
        Self {
            id,
            status: status.into(),
        }
    }

    pub fn processed(id: i64) -> Self {
        Self::new(id, PROCESSED_STATUS)
    }

    /// Exact, case-sensitive match on `"processed"`.
    pub fn is_processed(&self) -> bool {
        self.status == PROCESSED_STATUS
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// The `orders` topic.
pub struct OrdersTopic;

impl TopicDef for OrdersTopic {
    const TOPIC_NAME: &'static str = "orders";
    const CONSUMER_GROUP: &'static str = "order-processors";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let payload = Order::processed(1).to_payload().unwrap();
        assert_eq!(payload, br#"{"id":1,"status":"processed"}"#);
    }

    #[test]
    fn test_from_payload() {
        let order = Order::from_payload(br#"{"id":42,"status":"pending"}"#).unwrap();
        assert_eq!(order, Order::new(42, "pending"));
        assert!(!order.is_processed());
    }

    #[test]
    fn test_from_payload_malformed() {
        assert!(Order::from_payload(b"not json").is_err());
        assert!(Order::from_payload(br#"{"id":"one","status":"processed"}"#).is_err());
        assert!(Order::from_payload(b"").is_err());
    }

    #[test]
    fn test_processed_is_case_sensitive() {
        assert!(Order::processed(1).is_processed());
        assert!(!Order::new(1, "Processed").is_processed());
    }

    #[test]
    fn test_orders_topic() {
        assert_eq!(OrdersTopic::TOPIC_NAME, "orders");
        assert_eq!(OrdersTopic::CONSUMER_GROUP, "order-processors");
    }
}
