//! Order Service
//!
//! HTTP front end that places orders on the `orders` topic.
//!
//! ```text
//! POST /placeOrder {"id":1,"status":"processed"}
//!   ↓
//! OrderProducer (acks=all, bounded retries)
//!   ↓
//! Redis Stream (orders)
//! ```

pub mod api;
pub mod config;
pub mod replay;

use axum::Router;
use axum_helpers::{ShutdownCoordinator, create_app, create_router, health_router};
use config::ServiceConfig;
use core_config::{Environment, FromEnv, app_info};
use domain_orders::{OrderProducer, OrdersTopic, ProducerConfig};
use event_channel::{
    init_metrics,
    redis::{RedisPublisher, connect_with_retry},
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use tracing::info;

/// Build the full application router.
pub fn app(producer: OrderProducer, app_info: core_config::AppInfo) -> Router {
    create_router(api::router(api::AppState { producer }).merge(health_router(app_info)))
}

/// Run the order service until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The broker is unreachable after bounded retries
/// - The HTTP listener cannot bind
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting order service");

    let config = ServiceConfig::from_env().wrap_err("Failed to load configuration")?;

    info!("Connecting to broker...");
    let conn = connect_with_retry(&config.broker.url, Some(config.broker.retry_config()))
        .await
        .wrap_err("Failed to connect to broker")?;
    info!("Connected to broker successfully");

    let publisher = RedisPublisher::for_topic::<OrdersTopic>(conn, config.broker.ack_level);
    let producer = OrderProducer::new(
        Arc::new(publisher),
        ProducerConfig::default().with_retry(config.broker.retry_config()),
    );

    let shutdown = ShutdownCoordinator::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_signal().await }
    });

    if let Some(period) = config.replay_interval {
        tokio::spawn(replay::replay_processed(
            producer.clone(),
            period,
            shutdown.subscribe(),
        ));
    }

    create_app(app(producer, app_info), &config.server, shutdown.wait())
        .await
        .wrap_err("Order service failed")?;

    info!("Order service stopped");
    Ok(())
}
