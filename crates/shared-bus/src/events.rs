//! # Gate Events
//!
//! Events emitted after a committed write. Consumers treat every event as a
//! hint to re-fetch authoritative state from the purchase store.
//!
//! ## Addressing
//!
//! | Event | Topic | Recipient |
//! |-------|-------|-----------|
//! | `PurchaseStatusChanged` | `Purchases` | record owner + dashboards |
//! | `PurchaseAcknowledged` | `Purchases` | record owner + dashboards |
//! | `ReferralCredited` | `Referrals` | referrer + dashboards |
//! | `AccessCodeRotated` | `Settings` | dashboards only |

use serde::{Deserialize, Serialize};
use shared_types::{
    Actor, Amount, CreditSource, DispositionAction, OperatorId, PurchaseRecord, PurchaseStatus,
    RecordId, Timestamp, UserId,
};

/// A purchase record changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub record_id: RecordId,
    pub user_id: UserId,
    /// `None` for a freshly submitted record.
    pub previous_status: Option<PurchaseStatus>,
    pub new_status: PurchaseStatus,
    pub action: Option<DispositionAction>,
    /// Record version after the write; strictly increasing per record.
    pub record_version: u64,
    pub actor: Actor,
    pub occurred_at: Timestamp,
}

impl StatusChange {
    /// Builds the event for a record that was just created.
    pub fn submitted(record: &PurchaseRecord) -> Self {
        Self {
            record_id: record.id(),
            user_id: record.user_id().clone(),
            previous_status: None,
            new_status: record.status(),
            action: None,
            record_version: record.version(),
            actor: Actor::User(record.user_id().clone()),
            occurred_at: record.created_at(),
        }
    }

    /// Builds the event for a committed transition out of `previous`.
    pub fn transitioned(previous: PurchaseStatus, record: &PurchaseRecord) -> Self {
        Self {
            record_id: record.id(),
            user_id: record.user_id().clone(),
            previous_status: Some(previous),
            new_status: record.status(),
            action: record.last_action(),
            record_version: record.version(),
            actor: record
                .decided_by()
                .cloned()
                .unwrap_or_else(|| Actor::User(record.user_id().clone())),
            occurred_at: record.last_transition_at(),
        }
    }
}

/// Events carried by the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateEvent {
    PurchaseStatusChanged(StatusChange),

    /// The owner dismissed the current status.
    PurchaseAcknowledged {
        record_id: RecordId,
        user_id: UserId,
        record_version: u64,
    },

    ReferralCredited {
        referrer_id: UserId,
        new_user_id: UserId,
        amount: Amount,
        source: CreditSource,
    },

    AccessCodeRotated {
        version: u64,
        updated_by: OperatorId,
        updated_at: Timestamp,
    },
}

impl GateEvent {
    /// Topic used for subscription filtering.
    pub fn topic(&self) -> EventTopic {
        match self {
            GateEvent::PurchaseStatusChanged(_) | GateEvent::PurchaseAcknowledged { .. } => {
                EventTopic::Purchases
            }
            GateEvent::ReferralCredited { .. } => EventTopic::Referrals,
            GateEvent::AccessCodeRotated { .. } => EventTopic::Settings,
        }
    }

    /// The user whose live session should receive this event, if any.
    pub fn recipient(&self) -> Option<&UserId> {
        match self {
            GateEvent::PurchaseStatusChanged(change) => Some(&change.user_id),
            GateEvent::PurchaseAcknowledged { user_id, .. } => Some(user_id),
            GateEvent::ReferralCredited { referrer_id, .. } => Some(referrer_id),
            GateEvent::AccessCodeRotated { .. } => None,
        }
    }

    /// `(record, version)` for events that must be observed in per-record order.
    pub fn ordering_key(&self) -> Option<(RecordId, u64)> {
        match self {
            GateEvent::PurchaseStatusChanged(change) => {
                Some((change.record_id, change.record_version))
            }
            GateEvent::PurchaseAcknowledged {
                record_id,
                record_version,
                ..
            } => Some((*record_id, *record_version)),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Purchases,
    Referrals,
    Settings,
    /// Matches every topic.
    All,
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    /// Topics to subscribe to (empty = all).
    pub topics: Vec<EventTopic>,

    /// Restrict to events addressed to this user (`None` = dashboard view).
    pub user: Option<UserId>,
}

impl EventFilter {
    /// Every event on every topic.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Every event on the given topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics, user: None }
    }

    /// A user's live session: purchase and referral events addressed to them.
    #[must_use]
    pub fn for_user(user: UserId) -> Self {
        Self {
            topics: vec![EventTopic::Purchases, EventTopic::Referrals],
            user: Some(user),
        }
    }

    /// An operator dashboard.
    #[must_use]
    pub fn dashboard() -> Self {
        Self::all()
    }

    /// Key used for subscription bookkeeping.
    pub fn audience(&self) -> String {
        match &self.user {
            Some(user) => format!("user:{}", user),
            None => "dashboard".to_string(),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &GateEvent) -> bool {
        let topic_ok = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());
        if !topic_ok {
            return false;
        }
        match &self.user {
            Some(user) => event.recipient() == Some(user),
            None => true,
        }
    }
}
