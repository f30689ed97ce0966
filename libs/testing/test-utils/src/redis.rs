//! Redis test infrastructure
//!
//! Provides a `TestRedis` helper that starts a Redis container for stream tests.

use redis::Client;
use redis::aio::MultiplexedConnection;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

/// Redis container that is stopped and removed when dropped.
pub struct TestRedis {
    #[allow(dead_code)]
    container: ContainerAsync<Redis>,
    connection: MultiplexedConnection,
    url: String,
}

impl TestRedis {
    /// Start Redis 8 Alpine and connect to it.
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag("8-alpine")
            .start()
            .await
            .expect("Failed to start Redis container");

        let host_port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let url = format!("redis://127.0.0.1:{}", host_port);

        let connection = Client::open(url.clone())
            .expect("Failed to create Redis client")
            .get_multiplexed_async_connection()
            .await
            .expect("Failed to connect to Redis");

        tracing::info!(port = host_port, "Test Redis ready (Redis 8-alpine)");

        Self {
            container,
            connection,
            url,
        }
    }

    /// Connection URL for code under test
    pub fn url(&self) -> &str {
        &self.url
    }

    /// A connection for assertions made directly against Redis
    pub fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Number of entries in a stream
    pub async fn stream_len(&self, topic: &str) -> u64 {
        let mut conn = self.connection();
        redis::cmd("XLEN")
            .arg(topic)
            .query_async(&mut conn)
            .await
            .expect("XLEN failed")
    }

    /// Delivered but unacknowledged entries for a consumer group
    pub async fn pending_count(&self, topic: &str, group: &str) -> u64 {
        let mut conn = self.connection();
        let (count, _, _, _): (u64, Option<String>, Option<String>, Option<Vec<(String, u64)>>) =
            redis::cmd("XPENDING")
                .arg(topic)
                .arg(group)
                .query_async(&mut conn)
                .await
                .expect("XPENDING failed");
        count
    }
}

impl Drop for TestRedis {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Redis container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Docker
    async fn test_stream_helpers() {
        let redis = TestRedis::new().await;
        let mut conn = redis.connection();

        let _: String = redis::cmd("XADD")
            .arg("t")
            .arg("*")
            .arg("payload")
            .arg("x")
            .query_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(redis.stream_len("t").await, 1);

        let _: () = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg("t")
            .arg("g")
            .arg("0")
            .query_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(redis.pending_count("t", "g").await, 0);
    }
}
