//! Email Service Worker
//!
//! Reads the `orders` topic on its own (no consumer group) and emails the
//! customer for processed orders, at most once per idle window.
//!
//! ```text
//! Redis Stream (orders)
//!   ↓ (standalone reader, from the earliest entry)
//! NotificationDispatcher
//!   ↓ (dedup window, 10s idle reset)
//! EmailNotifier
//!   ↓ (handlebars + SMTP)
//! Email Delivery
//! ```

pub mod config;

use axum::{Router, routing::get};
use axum_helpers::{ShutdownCoordinator, create_app, create_router, health_router};
use config::EmailServiceConfig;
use core_config::{AppInfo, Environment, FromEnv, app_info};
use domain_orders::{NotificationDispatcher, OrdersTopic};
use email::{EmailNotifier, SmtpProvider};
use event_channel::{
    StartOffset, TopicDef, init_metrics,
    redis::{RedisStandaloneReader, connect_with_retry},
    render_metrics,
};
use eyre::{Result, WrapErr};
use tracing::{error, info};

/// Health and metrics routes.
pub fn admin_router(app_info: AppInfo) -> Router {
    create_router(
        Router::new()
            .route("/metrics", get(|| async { render_metrics() }))
            .merge(health_router(app_info)),
    )
}

/// Run the email service until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The SMTP transport cannot be built
/// - The broker is unreachable after bounded retries
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting email service");

    let config = EmailServiceConfig::from_env().wrap_err("Failed to load configuration")?;
    info!(
        idle_timeout_secs = config.dispatcher.idle_timeout.as_secs(),
        dedup = ?config.dispatcher.dedup,
        smtp_host = %config.smtp.host,
        "Dispatcher configuration loaded"
    );

    let provider = SmtpProvider::new(config.smtp).wrap_err("Failed to create SMTP provider")?;
    let notifier = EmailNotifier::new(provider, config.notifier)
        .wrap_err("Failed to initialize email notifier")?;

    info!("Connecting to broker...");
    let conn = connect_with_retry(&config.broker.url, Some(config.broker.retry_config()))
        .await
        .wrap_err("Failed to connect to broker")?;
    let reader = RedisStandaloneReader::open(conn, OrdersTopic::TOPIC_NAME, StartOffset::Earliest)
        .await
        .wrap_err("Failed to open orders reader")?;
    info!("Consuming messages from the 'orders' topic");

    let shutdown = ShutdownCoordinator::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_signal().await }
    });

    let health_config = config.health.clone();
    let health_shutdown = shutdown.wait();
    let health_server = tokio::spawn(async move {
        if let Err(e) = create_app(admin_router(app_info), &health_config, health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let result = NotificationDispatcher::new(reader, notifier, config.dispatcher)
        .run(shutdown.subscribe())
        .await;
    shutdown.shutdown();
    let _ = health_server.await;

    result.wrap_err("Notification dispatcher failed")?;
    info!("Email service stopped");
    Ok(())
}
