//! # Referral Credit Outbox
//!
//! One entry per referred user whose bonus has not reached the ledger yet.
//!
//! ```text
//! approval commit ──► AwaitingConfirmation ──► (confirm link, as below)
//!
//! confirm link ──► AwaitingLedger ──ledger ok──► (entry removed)
//!                        │
//!                   ledger failed ──► stays, attempts += 1, retried by reconcile
//!
//! link lookup failed ──► LookupFailed ──► reconcile re-runs the whole credit
//! ```
//!
//! `AwaitingConfirmation` is written in the same batch as an approval of a
//! referred user, and `AwaitingLedger` in the same batch as the link
//! confirmation. A crash at any point after the approval still leaves a
//! retryable entry behind.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, CreditSource, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingCreditKind {
    /// An approval committed; the credit has not been attempted yet.
    AwaitingConfirmation,
    /// The link could not be read; nothing was confirmed yet.
    LookupFailed { amount: Amount },
    /// The link is confirmed; the ledger credit has not been acknowledged.
    AwaitingLedger { referrer_id: UserId, amount: Amount },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCredit {
    pub new_user_id: UserId,
    pub kind: PendingCreditKind,
    pub source: CreditSource,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PendingCredit {
    pub fn new(
        new_user_id: UserId,
        kind: PendingCreditKind,
        source: CreditSource,
        now: Timestamp,
    ) -> Self {
        Self {
            new_user_id,
            kind,
            source,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Entries written before the link was confirmed.
    pub fn is_unconfirmed(&self) -> bool {
        !matches!(self.kind, PendingCreditKind::AwaitingLedger { .. })
    }

    /// The entry after another failed attempt.
    pub fn failed(&self, error: impl Into<String>, now: Timestamp) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            last_error: Some(error.into()),
            updated_at: now,
            ..self.clone()
        }
    }
}
