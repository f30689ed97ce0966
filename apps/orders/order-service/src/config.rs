use core_config::{ConfigError, FromEnv, env_parse_opt, server::ServerConfig};
use event_channel::redis::BrokerConfig;
use std::time::Duration;

/// Order service settings
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub broker: BrokerConfig,
    /// Periodic re-publish of a processed order, off when unset
    pub replay_interval: Option<Duration>,
}

impl FromEnv for ServiceConfig {
    /// - PORT: defaults to 5000
    /// - ORDER_REPLAY_INTERVAL_SECS: unset or 0 disables the replay task
    /// - broker settings, see [`BrokerConfig`]
    fn from_env() -> Result<Self, ConfigError> {
        let replay_interval = env_parse_opt::<u64>("ORDER_REPLAY_INTERVAL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            server: ServerConfig::from_env_with("PORT", 5000)?,
            broker: BrokerConfig::from_env()?,
            replay_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("BROKER_URL", Some("redis://localhost:6379")),
                ("PORT", None),
                ("ORDER_REPLAY_INTERVAL_SECS", None),
            ],
            || {
                let config = ServiceConfig::from_env().unwrap();
                assert_eq!(config.server.port, 5000);
                assert!(config.replay_interval.is_none());
            },
        );
    }

    #[test]
    fn test_replay_interval() {
        temp_env::with_vars(
            [
                ("BROKER_URL", Some("redis://localhost:6379")),
                ("ORDER_REPLAY_INTERVAL_SECS", Some("300")),
            ],
            || {
                let config = ServiceConfig::from_env().unwrap();
                assert_eq!(config.replay_interval, Some(Duration::from_secs(300)));
            },
        );

        temp_env::with_vars(
            [
                ("BROKER_URL", Some("redis://localhost:6379")),
                ("ORDER_REPLAY_INTERVAL_SECS", Some("0")),
            ],
            || {
                assert!(ServiceConfig::from_env().unwrap().replay_interval.is_none());
            },
        );
    }

    #[test]
    fn test_missing_broker_url() {
        temp_env::with_vars(
            [("BROKER_URL", None::<&str>), ("REDIS_URL", None)],
            || {
                let err = ServiceConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("BROKER_URL"));
            },
        );
    }
}
