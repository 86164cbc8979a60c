//! Referral links and the versioned global access-code setting.

use crate::entities::{Amount, OperatorId, RecordId, UserId};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Credit state of a referral link. `Pending -> Confirmed` happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditStatus {
    Pending,
    Confirmed,
}

/// What confirmed a referral credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditSource {
    /// First approval of the referred user's purchase.
    Approval(Option<RecordId>),
    /// Operator override.
    Manual(OperatorId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralLink {
    pub referrer_id: UserId,
    pub new_user_id: UserId,
    pub credit_status: CreditStatus,
    pub amount_given: Option<Amount>,
    pub created_at: Timestamp,
    pub confirmed_at: Option<Timestamp>,
    pub confirmed_by: Option<CreditSource>,
}

impl ReferralLink {
    pub fn new(referrer_id: UserId, new_user_id: UserId, now: Timestamp) -> Self {
        Self {
            referrer_id,
            new_user_id,
            credit_status: CreditStatus::Pending,
            amount_given: None,
            created_at: now,
            confirmed_at: None,
            confirmed_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.credit_status == CreditStatus::Pending
    }

    /// The confirmed form of this link, or `None` if it was already confirmed.
    pub fn confirmed(&self, amount: Amount, source: CreditSource, now: Timestamp) -> Option<Self> {
        if !self.is_pending() {
            return None;
        }
        Some(Self {
            credit_status: CreditStatus::Confirmed,
            amount_given: Some(amount),
            confirmed_at: Some(now),
            confirmed_by: Some(source),
            ..self.clone()
        })
    }

    /// Ledger idempotency reference for this link's bonus.
    pub fn ledger_reference(&self) -> String {
        Self::ledger_reference_for(&self.new_user_id)
    }

    pub fn ledger_reference_for(new_user_id: &UserId) -> String {
        format!("referral:{}", new_user_id)
    }
}

/// Operator-configured code applied to future approvals.
///
/// Read once at approval time and stamped onto the record; later changes never
/// rewrite historical records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCodeSetting {
    pub version: u64,
    pub code: String,
    pub updated_by: OperatorId,
    pub updated_at: Timestamp,
}
