use crate::retry::RetryConfig;
use crate::subscription::AckLevel;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or};

/// Broker connection and durability settings
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    pub url: String,
    pub ack_level: AckLevel,
    /// Bounded retries for publishes and startup connections
    pub max_retries: u32,
}

impl BrokerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ack_level: AckLevel::default(),
            max_retries: 5,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new().with_max_retries(self.max_retries)
    }
}

impl FromEnv for BrokerConfig {
    /// - BROKER_URL or REDIS_URL: required
    /// - BROKER_ACKS: `all` (default) or `leader`
    /// - BROKER_ACK_TIMEOUT_MS: defaults to 5000
    /// - BROKER_MAX_RETRIES: defaults to 5
    fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("BROKER_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("BROKER_URL".to_string()))?;

        let timeout_ms = env_parse_or("BROKER_ACK_TIMEOUT_MS", 5000u64)?;
        let ack_level = match env_or_default("BROKER_ACKS", "all").to_lowercase().as_str() {
            "all" | "-1" => AckLevel::AllReplicas { timeout_ms },
            "leader" | "1" => AckLevel::Leader,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "BROKER_ACKS".to_string(),
                    details: format!("expected 'all' or 'leader', got '{}'", other),
                });
            }
        };

        Ok(Self {
            url,
            ack_level,
            max_retries: env_parse_or("BROKER_MAX_RETRIES", 5)?,
        })
    }
}
