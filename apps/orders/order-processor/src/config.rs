use core_config::{
    ConfigError, FromEnv, env_or_default, env_parse_opt, env_parse_or, server::ServerConfig,
};
use domain_orders::{ManagerConfig, OrdersTopic};
use event_channel::{GroupSubscription, TopicDef, redis::BrokerConfig};
use std::time::Duration;

/// Order processor worker settings
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Health and metrics listener
    pub health: ServerConfig,
    pub broker: BrokerConfig,
    pub manager: ManagerConfig,
}

impl FromEnv for ProcessorConfig {
    /// - HEALTH_PORT: defaults to 8081
    /// - CONSUMER_GROUP: defaults to `order-processors`
    /// - CONSUMER_RECOVERY_BACKOFF_SECS: defaults to 5
    /// - CONSUMER_MAX_RECOVERY_ATTEMPTS: unset retries forever
    fn from_env() -> Result<Self, ConfigError> {
        let group = env_or_default("CONSUMER_GROUP", OrdersTopic::CONSUMER_GROUP);
        let subscription = GroupSubscription::from_topic_def::<OrdersTopic>().with_group(group);

        let manager = ManagerConfig::new(subscription)
            .with_recovery_backoff(Duration::from_secs(env_parse_or(
                "CONSUMER_RECOVERY_BACKOFF_SECS",
                5u64,
            )?))
            .with_max_recovery_attempts(env_parse_opt("CONSUMER_MAX_RECOVERY_ATTEMPTS")?);

        Ok(Self {
            health: ServerConfig::from_env_with("HEALTH_PORT", 8081)?,
            broker: BrokerConfig::from_env()?,
            manager,
        })
    }
}
