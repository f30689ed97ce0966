//! Shared test utilities for the order pipeline crates
//!
//! - `TestRedis`: Redis container with automatic cleanup (feature: "redis")
//! - `TestNames`: deterministic, per-test topic and group names
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["redis"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestNames, TestRedis};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker/Redis
//! async fn my_redis_test() {
//!     let redis = TestRedis::new().await;
//!     let names = TestNames::from_test_name("my_redis_test");
//!     let topic = names.topic("orders");
//!     // point a publisher at redis.url() and publish to `topic`
//! }
//! ```

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

use uuid::Uuid;

/// Per-test resource names, so tests sharing a broker never see each other's records.
pub struct TestNames {
    seed: u64,
}

impl TestNames {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test name (stable across runs)
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Seed from a random UUID (unique per run)
    pub fn random() -> Self {
        Self::new(Uuid::new_v4().as_u128() as u64)
    }

    pub fn topic(&self, base: &str) -> String {
        format!("test:{}:{}", base, self.seed)
    }

    pub fn group(&self, base: &str) -> String {
        format!("test-{}-{}", base, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_deterministic() {
        let a = TestNames::from_test_name("publish");
        let b = TestNames::from_test_name("publish");
        assert_eq!(a.topic("orders"), b.topic("orders"));
        assert_eq!(a.group("processors"), b.group("processors"));
    }

    #[test]
    fn test_names_differ_between_tests() {
        let a = TestNames::from_test_name("publish");
        let b = TestNames::from_test_name("consume");
        assert_ne!(a.topic("orders"), b.topic("orders"));
    }

    #[test]
    fn test_random_names() {
        assert_ne!(TestNames::random().topic("o"), TestNames::random().topic("o"));
    }
}
