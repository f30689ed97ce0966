//! # Axum Helpers
//!
//! Shared HTTP plumbing for the order pipeline binaries.
//!
//! ## Modules
//!
//! - **[`server`]**: Server setup, health endpoints, graceful shutdown
//! - **[`errors`]**: JSON error bodies for unmatched routes
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router, shutdown_signal};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = create_router(api_routes).merge(health_router(app_info!()));
//! create_app(router, &ServerConfig::default(), shutdown_signal()).await?;
//! ```

pub mod errors;
pub mod server;

pub use errors::{ErrorResponse, not_found};
pub use server::{
    HealthResponse, ShutdownCoordinator, create_app, create_router, health_router,
    shutdown_signal,
};
