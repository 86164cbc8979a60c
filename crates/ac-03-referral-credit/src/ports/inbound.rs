//! # Driving Ports (API - Inbound)

use crate::domain::{ReconcileReport, ReferralOutcome};
use shared_types::{Amount, GateResult, OperatorId, RecordId, ReferralLink, UserId};

pub trait ReferralCreditApi: Send + Sync {
    /// Records that `referrer_id` referred `new_user_id`.
    fn register_referral(&self, referrer_id: &UserId, new_user_id: &UserId)
        -> GateResult<ReferralLink>;

    /// Automatic path, run after an approval commits.
    fn try_credit(&self, new_user_id: &UserId, approved_record: RecordId)
        -> GateResult<ReferralOutcome>;

    /// Operator override. Same at-most-once guarantee as `try_credit`;
    /// `amount` replaces the configured bonus when given.
    fn manual_credit(
        &self,
        new_user_id: &UserId,
        operator: &OperatorId,
        amount: Option<Amount>,
    ) -> GateResult<ReferralOutcome>;

    /// Retries every entry in the reconciliation outbox.
    fn reconcile(&self) -> GateResult<ReconcileReport>;
}
