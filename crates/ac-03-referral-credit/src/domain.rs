//! Referral credit outcomes and settings.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, UserId};

/// What one credit attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralOutcome {
    /// This attempt won the `Pending -> Confirmed` swap and the ledger took
    /// the credit.
    Credited { referrer_id: UserId, amount: Amount },
    /// The link was already confirmed by an earlier attempt. Not an error.
    AlreadyCredited,
    /// No link names this user.
    NoReferral,
    /// Left in the reconciliation outbox.
    Deferred { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Bonus credited to the referrer, in minor units.
    pub bonus: Amount,
    /// How long reconciliation leaves a fresh approval's credit to the
    /// approving call before taking it over.
    pub confirmation_grace_ms: u64,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            bonus: Amount(500),
            confirmation_grace_ms: 30_000,
        }
    }
}

/// Summary of one `reconcile` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Entries whose credit reached the ledger.
    pub settled: usize,
    /// Entries dropped because there was nothing left to credit.
    pub discarded: usize,
    /// Entries that failed again and stay queued.
    pub still_pending: usize,
}
