//! Connects the disposition engine's `ReferralCreditPort` to the referral
//! credit trigger.

use ac_01_purchase_store::KeyValueStore;
use ac_02_disposition::{ReferralCreditPort, ReferralCreditResult};
use ac_03_referral_credit::{ReferralCreditApi, ReferralCreditTrigger, ReferralOutcome};
use shared_types::{GateResult, RecordId, UserId};
use std::sync::Arc;

pub struct ReferralCreditAdapter<K: KeyValueStore> {
    trigger: Arc<ReferralCreditTrigger<K>>,
}

impl<K: KeyValueStore> ReferralCreditAdapter<K> {
    pub fn new(trigger: Arc<ReferralCreditTrigger<K>>) -> Self {
        Self { trigger }
    }
}

impl<K: KeyValueStore> ReferralCreditPort for ReferralCreditAdapter<K> {
    fn try_credit(
        &self,
        new_user_id: &UserId,
        approved_record: RecordId,
    ) -> GateResult<ReferralCreditResult> {
        let outcome = self.trigger.try_credit(new_user_id, approved_record)?;
        Ok(match outcome {
            ReferralOutcome::Credited {
                referrer_id,
                amount,
            } => ReferralCreditResult::Credited {
                referrer_id,
                amount,
            },
            ReferralOutcome::AlreadyCredited => ReferralCreditResult::AlreadyCredited,
            ReferralOutcome::NoReferral => ReferralCreditResult::NoReferral,
            ReferralOutcome::Deferred { reason } => ReferralCreditResult::Deferred { reason },
        })
    }
}
