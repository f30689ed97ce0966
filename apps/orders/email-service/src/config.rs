use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or, server::ServerConfig};
use domain_orders::{DedupPolicy, DispatcherConfig};
use email::{NotifierConfig, SmtpConfig};
use event_channel::redis::BrokerConfig;
use std::time::Duration;

/// Email service worker settings
#[derive(Clone, Debug)]
pub struct EmailServiceConfig {
    /// Health and metrics listener
    pub health: ServerConfig,
    pub broker: BrokerConfig,
    pub dispatcher: DispatcherConfig,
    pub smtp: SmtpConfig,
    pub notifier: NotifierConfig,
}

/// - DISPATCHER_DEDUP: `global` (default) or `per-order`
/// - DISPATCHER_DEDUP_TTL_SECS: per-order memory, defaults to 3600
/// - DISPATCHER_DEDUP_MAX_ENTRIES: per-order capacity, defaults to 10000
fn dedup_from_env() -> Result<DedupPolicy, ConfigError> {
    match env_or_default("DISPATCHER_DEDUP", "global")
        .to_lowercase()
        .as_str()
    {
        "global" => Ok(DedupPolicy::GlobalWindow),
        "per-order" | "per_order" => Ok(DedupPolicy::PerOrder {
            ttl: Duration::from_secs(env_parse_or("DISPATCHER_DEDUP_TTL_SECS", 3600u64)?),
            max_entries: env_parse_or("DISPATCHER_DEDUP_MAX_ENTRIES", 10_000usize)?,
        }),
        other => Err(ConfigError::InvalidValue {
            key: "DISPATCHER_DEDUP".to_string(),
            details: format!("expected global or per-order, got '{}'", other),
        }),
    }
}

impl FromEnv for EmailServiceConfig {
    /// - HEALTH_PORT: defaults to 8082
    /// - DISPATCHER_IDLE_TIMEOUT_SECS: defaults to 10
    fn from_env() -> Result<Self, ConfigError> {
        let dispatcher = DispatcherConfig::default()
            .with_idle_timeout(Duration::from_secs(env_parse_or(
                "DISPATCHER_IDLE_TIMEOUT_SECS",
                10u64,
            )?))
            .with_dedup(dedup_from_env()?);

        Ok(Self {
            health: ServerConfig::from_env_with("HEALTH_PORT", 8082)?,
            broker: BrokerConfig::from_env()?,
            dispatcher,
            smtp: SmtpConfig::from_env()?,
            notifier: NotifierConfig::from_env()?,
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
                ("HEALTH_PORT", None),
                ("DISPATCHER_IDLE_TIMEOUT_SECS", None),
                ("DISPATCHER_DEDUP", None),
                ("NOTIFY_RECIPIENT", None),
            ],
            || {
                let config = EmailServiceConfig::from_env().unwrap();
                assert_eq!(config.health.port, 8082);
                assert_eq!(config.dispatcher.idle_timeout, Duration::from_secs(10));
                assert_eq!(config.dispatcher.dedup, DedupPolicy::GlobalWindow);
                assert_eq!(config.notifier.recipient, "customer@example.com");
            },
        );
    }

    #[test]
    fn test_per_order_dedup() {
        temp_env::with_vars(
            [
                ("BROKER_URL", Some("redis://localhost:6379")),
                ("DISPATCHER_DEDUP", Some("per-order")),
                ("DISPATCHER_DEDUP_TTL_SECS", Some("60")),
                ("DISPATCHER_DEDUP_MAX_ENTRIES", None),
            ],
            || {
                let config = EmailServiceConfig::from_env().unwrap();
                assert_eq!(
                    config.dispatcher.dedup,
                    DedupPolicy::PerOrder {
                        ttl: Duration::from_secs(60),
                        max_entries: 10_000
                    }
                );
            },
        );
    }

    #[test]
    fn test_unknown_dedup_policy() {
        temp_env::with_vars(
            [
                ("BROKER_URL", Some("redis://localhost:6379")),
                ("DISPATCHER_DEDUP", Some("sometimes")),
            ],
            || {
                let err = EmailServiceConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("DISPATCHER_DEDUP"));
            },
        );
    }
}
