//! Orders Domain
//!
//! The event pipeline for orders: placing them on the `orders` topic,
//! consuming them in a consumer group, and notifying customers once
//! they are processed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  OrderProducer  │  ← place(order), bounded retries
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  orders topic   │  ← Event Channel
//! └───┬─────────┬───┘
//!     │         │
//! ┌───▼───┐ ┌───▼──────────────────┐
//! │ Group │ │ NotificationDispatcher│  ← standalone reader, windowed dedup
//! │Manager│ └───┬──────────────────┘
//! └───────┘     │
//!          ┌────▼─────┐
//!          │ Notifier │  ← email, etc.
//!          └──────────┘
//! ```
//!
//! The two consumers read the topic independently and share no state.

pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod processor;
pub mod producer;
mod signal;
pub mod slot;
pub mod window;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use error::{OrderError, OrderResult, PublishError};
pub use manager::{ConsumerGroupManager, ManagerConfig, ManagerExit, ManagerState};
pub use metrics::OrderMetrics;
pub use models::{Order, OrdersTopic, PROCESSED_STATUS};
pub use notifier::Notifier;
pub use processor::{LoggingOrderProcessor, OrderProcessor};
pub use producer::{OrderProducer, ProducerConfig};
pub use slot::MembershipSlot;
pub use window::{DedupPolicy, NotificationWindow, WindowOutcome};
