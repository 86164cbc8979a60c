//! # Notification Dispatcher
//!
//! ```text
//! InMemoryEventBus ──subscribe(all)──→ dispatcher task ──→ NotificationTransport
//!                                          │
//!                                          └─ shutdown watch ends the loop
//! ```
//!
//! | Event | Notification |
//! |-------|--------------|
//! | submitted (Pending) | "Purchase submitted" |
//! | Approved | "Access code ready" |
//! | Rejected | "Purchase rejected" |
//! | Cancelled via revoke | "Access code revoked" |
//! | Cancelled | "Purchase cancelled" |
//! | `ReferralCredited` | "Referral bonus" to the referrer |
//! | acknowledgement, code rotation | none |

use crate::notify::transport::{Notification, NotificationTransport};
use shared_bus::{GateEvent, StatusChange, Subscription};
use shared_types::{DispositionAction, PurchaseStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
    stats: Arc<DispatchStats>,
}

fn purchase_notification(change: &StatusChange) -> Notification {
    let (title, body) = match (change.new_status, change.action) {
        (PurchaseStatus::Pending, _) => (
            "Purchase submitted",
            "Your access code purchase is awaiting review.",
        ),
        (PurchaseStatus::Approved, _) => (
            "Access code ready",
            "Your purchase was approved. Open the app to view your access code.",
        ),
        (PurchaseStatus::Rejected, _) => (
            "Purchase rejected",
            "Your access code purchase was rejected. You can submit a new one.",
        ),
        (PurchaseStatus::Cancelled, Some(DispositionAction::Revoke)) => (
            "Access code revoked",
            "Your access code is no longer valid. Purchase a new one to withdraw.",
        ),
        (PurchaseStatus::Cancelled, _) => (
            "Purchase cancelled",
            "Your access code purchase was cancelled.",
        ),
    };
    Notification {
        user_id: change.user_id.clone(),
        title: title.to_string(),
        body: body.to_string(),
        cta_ref: Some(format!("purchase:{}", change.record_id)),
        record_id: Some(change.record_id),
    }
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        self.stats.clone()
    }

    /// The notification an event produces, if any.
    pub fn notification_for(event: &GateEvent) -> Option<Notification> {
        match event {
            GateEvent::PurchaseStatusChanged(change) => Some(purchase_notification(change)),
            GateEvent::ReferralCredited {
                referrer_id,
                new_user_id,
                amount,
                ..
            } => Some(Notification {
                user_id: referrer_id.clone(),
                title: "Referral bonus".to_string(),
                body: format!("You earned {} for referring {}.", amount, new_user_id),
                cta_ref: Some("referrals".to_string()),
                record_id: None,
            }),
            GateEvent::PurchaseAcknowledged { .. } | GateEvent::AccessCodeRotated { .. } => None,
        }
    }

    /// Delivers the notification for one event. Returns whether one was sent.
    pub async fn dispatch(&self, event: &GateEvent) -> bool {
        let Some(notification) = Self::notification_for(event) else {
            return false;
        };
        match self.transport.deliver(&notification).await {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(user_id = %notification.user_id, title = %notification.title, "notification delivered");
                true
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    user_id = %notification.user_id,
                    title = %notification.title,
                    error = %e,
                    "notification delivery failed"
                );
                false
            }
        }
    }

    /// Runs until the bus closes or `shutdown` flips to true.
    pub fn spawn(
        self,
        mut subscription: Subscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Notification dispatcher started");
            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Some(event) => {
                            self.dispatch(&event).await;
                        }
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(
                delivered = self.stats.delivered(),
                failed = self.stats.failed(),
                "Notification dispatcher stopped"
            );
        })
    }
}
