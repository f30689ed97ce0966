//! Order Processor Worker
//!
//! Member of the `orders` consumer group. Processes every order and commits
//! each record, recovering the membership after consume failures.
//!
//! ```text
//! Redis Stream (orders)
//!   ↓ (Consumer Group: order-processors)
//! ConsumerGroupManager
//!   ↓
//! LoggingOrderProcessor
//! ```

pub mod config;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_helpers::{ShutdownCoordinator, create_app, create_router, health_router};
use config::ProcessorConfig;
use core_config::{AppInfo, Environment, FromEnv, app_info};
use domain_orders::{ConsumerGroupManager, LoggingOrderProcessor, ManagerExit, ManagerState};
use event_channel::{init_metrics, redis::RedisMembershipFactory, render_metrics};
use eyre::{Result, WrapErr};
use tokio::sync::watch;
use tracing::{error, info};

/// `/ready` is 200 only while the consume loop is running.
async fn ready(State(state): State<watch::Receiver<ManagerState>>) -> Response {
    let current = *state.borrow();
    let status = if current == ManagerState::Running {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, format!("{:?}", current)).into_response()
}

/// Health, readiness and metrics routes.
pub fn admin_router(app_info: AppInfo, state: watch::Receiver<ManagerState>) -> Router {
    create_router(
        Router::new()
            .route("/ready", get(ready))
            .route("/metrics", get(|| async { render_metrics() }))
            .with_state(state)
            .merge(health_router(app_info)),
    )
}

/// Run the order processor until a shutdown signal or the claim completes.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The initial group join fails
/// - Recovery gives up after the configured ceiling
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    init_metrics();

    let app_info = app_info!();
    info!(name = %app_info.name, version = %app_info.version, "Starting order processor");

    let config = ProcessorConfig::from_env().wrap_err("Failed to load configuration")?;
    info!(
        topic = %config.manager.subscription.topic,
        consumer_group = %config.manager.subscription.group,
        consumer_id = %config.manager.subscription.consumer_id,
        recovery_backoff_secs = config.manager.recovery_backoff.as_secs(),
        "Consumer configuration loaded"
    );

    let factory = RedisMembershipFactory::new(&config.broker.url)
        .wrap_err("Failed to create broker client")?;
    let manager = ConsumerGroupManager::new(factory, LoggingOrderProcessor, config.manager);

    let shutdown = ShutdownCoordinator::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.wait_for_signal().await }
    });

    let admin = admin_router(app_info, manager.state());
    let health_config = config.health.clone();
    let health_shutdown = shutdown.wait();
    let health_server = tokio::spawn(async move {
        if let Err(e) = create_app(admin, &health_config, health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let result = manager.run_until(shutdown.wait()).await;
    shutdown.shutdown();
    let _ = health_server.await;

    match result.wrap_err("Consumer group manager failed")? {
        ManagerExit::Interrupted => info!("Interrupt is detected"),
        ManagerExit::ClaimCompleted => info!("Consumer closed"),
    }

    info!("Order processor stopped");
    Ok(())
}
