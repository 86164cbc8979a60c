//! # Outbound Ports (Driven Ports)
//!
//! The engine's dependencies besides the purchase store and the event
//! publisher.

use shared_types::{Amount, GateResult, RecordId, UserId};

/// What a referral credit attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralCreditResult {
    /// This attempt confirmed the link and the referrer was credited.
    Credited { referrer_id: UserId, amount: Amount },
    /// The link had already been confirmed; nothing happened.
    AlreadyCredited,
    /// The user was not referred.
    NoReferral,
    /// The attempt failed and was queued for reconciliation.
    Deferred { reason: String },
}

/// Referral crediting, invoked after a first approval commits.
///
/// Production: the referral credit trigger, wired by the runtime.
pub trait ReferralCreditPort: Send + Sync {
    /// Credits the referrer of `new_user_id` at most once.
    fn try_credit(
        &self,
        new_user_id: &UserId,
        approved_record: RecordId,
    ) -> GateResult<ReferralCreditResult>;
}

/// Port for deployments without referrals.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferrals;

impl ReferralCreditPort for NoReferrals {
    fn try_credit(&self, _: &UserId, _: RecordId) -> GateResult<ReferralCreditResult> {
        Ok(ReferralCreditResult::NoReferral)
    }
}
