//! Notification deduplication windows.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// How the dispatcher decides whether an order may trigger a notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// At most one notification per idle window, whatever the order IDs.
    #[default]
    GlobalWindow,
    /// At most one notification per order ID within `ttl`, remembering up to
    /// `max_entries` IDs (oldest evicted first).
    PerOrder { ttl: Duration, max_entries: usize },
}

/// What a closing window saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Active,
    Idle,
}

/// Dedup state owned by the dispatcher loop.
#[derive(Debug)]
pub struct NotificationWindow {
    policy: DedupPolicy,
    notified_this_window: bool,
    saw_message_this_window: bool,
    seen: HashMap<i64, Instant>,
}

impl NotificationWindow {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            notified_this_window: false,
            saw_message_this_window: false,
            seen: HashMap::new(),
        }
    }

    /// Decide whether `order_id` may be notified now, and claim it if so.
    ///
    /// The claim is taken before the notifier runs, so a failed notification
    /// still counts.
    pub fn claim_notification(&mut self, order_id: i64, now: Instant) -> bool {
        match self.policy {
            DedupPolicy::GlobalWindow => {
                if self.notified_this_window {
                    return false;
                }
                self.notified_this_window = true;
                true
            }
            DedupPolicy::PerOrder { ttl, max_entries } => {
                self.seen.retain(|_, at| now.duration_since(*at) < ttl);
                if self.seen.contains_key(&order_id) {
                    return false;
                }

                if self.seen.len() >= max_entries.max(1) {
                    if let Some(oldest) = self
                        .seen
                        .iter()
                        .min_by_key(|(_, at)| **at)
                        .map(|(id, _)| *id)
                    {
                        self.seen.remove(&oldest);
                    }
                }

                self.seen.insert(order_id, now);
                self.notified_this_window = true;
                true
            }
        }
    }

    pub fn record_message(&mut self) {
        self.saw_message_this_window = true;
    }

    /// End the current window and start a fresh one.
    ///
    /// Per-order entries outlive windows and expire by their own TTL.
    pub fn close(&mut self, now: Instant) -> WindowOutcome {
        let outcome = if self.saw_message_this_window {
            WindowOutcome::Active
        } else {
            WindowOutcome::Idle
        };

        self.notified_this_window = false;
        self.saw_message_this_window = false;
        if let DedupPolicy::PerOrder { ttl, .. } = self.policy {
            self.seen.retain(|_, at| now.duration_since(*at) < ttl);
        }

        outcome
    }

    pub fn notified_this_window(&self) -> bool {
        self.notified_this_window
    }

    pub fn saw_message_this_window(&self) -> bool {
        self.saw_message_this_window
    }

    pub fn policy(&self) -> &DedupPolicy {
        &self.policy
    }
}
