//! # Referral Credit Trigger
//!
//! ```text
//! try_credit / manual_credit
//!        │
//!        ▼
//!  confirm_referral (CAS Pending -> Confirmed, writes AwaitingLedger entry)
//!        │            ├── NoLink ───────────► NoReferral
//!        │            ├── AlreadyConfirmed ─► AlreadyCredited
//!        │            └── store error ──────► LookupFailed entry, Deferred
//!        ▼
//!  ledger.credit(referrer, amount, "referral:<new_user>")
//!        ├── ok ────► entry removed, Credited
//!        └── error ─► entry kept (attempts + 1), Deferred
//! ```
//!
//! The swap on the link is the only serialization point, so two concurrent
//! attempts for the same user can never both reach the ledger. The ledger
//! reference makes a reconcile retry of an already-applied credit a no-op.
//!
//! An approval of a referred user commits an `AwaitingConfirmation` entry
//! with it. `try_credit` normally replaces it moments later; reconciliation
//! only takes such an entry over once `confirmation_grace_ms` has passed,
//! which covers a process that died between the approval and the credit.

use crate::domain::{ReconcileReport, ReferralConfig, ReferralOutcome};
use crate::ports::inbound::ReferralCreditApi;
use ac_01_purchase_store::{
    ConfirmOutcome, KeyValueStore, PendingCredit, PendingCreditKind, PurchaseStore,
};
use shared_types::{
    Amount, BalanceLedger, CreditSource, GateError, GateResult, LedgerEntryRef, OperatorId,
    RecordId, ReferralLink, UserId,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const LEDGER_REASON: &str = "referral bonus";

pub struct ReferralCreditTrigger<K: KeyValueStore> {
    store: Arc<PurchaseStore<K>>,
    ledger: Arc<dyn BalanceLedger>,
    config: ReferralConfig,
}

impl<K: KeyValueStore> ReferralCreditTrigger<K> {
    pub fn new(
        store: Arc<PurchaseStore<K>>,
        ledger: Arc<dyn BalanceLedger>,
        config: ReferralConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> ReferralConfig {
        self.config
    }

    /// Entries currently waiting for reconciliation.
    pub fn pending_credits(&self) -> GateResult<Vec<PendingCredit>> {
        self.store.pending_credits()
    }

    fn credit(
        &self,
        new_user_id: &UserId,
        amount: Amount,
        source: CreditSource,
    ) -> GateResult<ReferralOutcome> {
        let outcome = match self.store.confirm_referral(new_user_id, amount, source.clone()) {
            Ok(outcome) => outcome,
            Err(e) => {
                let entry = PendingCredit::new(
                    new_user_id.clone(),
                    PendingCreditKind::LookupFailed { amount },
                    source,
                    self.store.now(),
                )
                .failed(e.to_string(), self.store.now());
                if let Err(record_err) = self.store.record_pending_credit(&entry) {
                    error!(
                        new_user = %new_user_id,
                        error = %record_err,
                        "Could not queue referral credit for reconciliation"
                    );
                    return Err(e);
                }
                return Ok(ReferralOutcome::Deferred {
                    reason: e.to_string(),
                });
            }
        };

        match outcome {
            ConfirmOutcome::NoLink => {
                debug!(new_user = %new_user_id, "No referral link");
                Ok(ReferralOutcome::NoReferral)
            }
            ConfirmOutcome::AlreadyConfirmed(link) => {
                debug!(
                    new_user = %new_user_id,
                    referrer = %link.referrer_id,
                    "Referral already credited"
                );
                Ok(ReferralOutcome::AlreadyCredited)
            }
            ConfirmOutcome::Confirmed(link) => {
                info!(
                    new_user = %new_user_id,
                    referrer = %link.referrer_id,
                    amount = %amount,
                    "Referral link confirmed"
                );
                self.deliver(new_user_id, &link.referrer_id, amount)
            }
        }
    }

    /// Hands a confirmed credit to the ledger and settles the outbox entry.
    fn deliver(
        &self,
        new_user_id: &UserId,
        referrer_id: &UserId,
        amount: Amount,
    ) -> GateResult<ReferralOutcome> {
        let entry = LedgerEntryRef::new(
            ReferralLink::ledger_reference_for(new_user_id),
            LEDGER_REASON,
        );
        match self.ledger.credit(referrer_id, amount, &entry) {
            Ok(_) => {
                self.store.settle_credit(new_user_id)?;
                Ok(ReferralOutcome::Credited {
                    referrer_id: referrer_id.clone(),
                    amount,
                })
            }
            Err(e) => {
                let reason = e.to_string();
                if let Some(pending) = self.store.pending_credit(new_user_id)? {
                    self.store
                        .record_pending_credit(&pending.failed(reason.clone(), self.store.now()))?;
                }
                Ok(ReferralOutcome::Deferred { reason })
            }
        }
    }

    /// Retries one outbox entry.
    fn retry(&self, entry: &PendingCredit) -> GateResult<RetryResult> {
        let amount = match &entry.kind {
            PendingCreditKind::AwaitingLedger {
                referrer_id,
                amount,
            } => {
                return match self.deliver(&entry.new_user_id, referrer_id, *amount)? {
                    ReferralOutcome::Credited { .. } => Ok(RetryResult::Settled),
                    _ => Ok(RetryResult::StillPending),
                };
            }
            PendingCreditKind::AwaitingConfirmation => {
                let age = self.store.now().saturating_sub(entry.created_at);
                if entry.attempts == 0 && age < self.config.confirmation_grace_ms {
                    return Ok(RetryResult::StillPending);
                }
                self.config.bonus
            }
            PendingCreditKind::LookupFailed { amount } => *amount,
        };

        match self.credit(&entry.new_user_id, amount, entry.source.clone())? {
            ReferralOutcome::Credited { .. } => Ok(RetryResult::Settled),
            ReferralOutcome::Deferred { .. } => Ok(RetryResult::StillPending),
            ReferralOutcome::AlreadyCredited | ReferralOutcome::NoReferral => {
                self.store.discard_unconfirmed_credit(&entry.new_user_id)?;
                Ok(RetryResult::Discarded)
            }
        }
    }
}

enum RetryResult {
    Settled,
    Discarded,
    StillPending,
}

impl<K: KeyValueStore> ReferralCreditApi for ReferralCreditTrigger<K> {
    fn register_referral(
        &self,
        referrer_id: &UserId,
        new_user_id: &UserId,
    ) -> GateResult<ReferralLink> {
        self.store.register_referral(referrer_id, new_user_id)
    }

    fn try_credit(
        &self,
        new_user_id: &UserId,
        approved_record: RecordId,
    ) -> GateResult<ReferralOutcome> {
        self.credit(
            new_user_id,
            self.config.bonus,
            CreditSource::Approval(Some(approved_record)),
        )
    }

    fn manual_credit(
        &self,
        new_user_id: &UserId,
        operator: &OperatorId,
        amount: Option<Amount>,
    ) -> GateResult<ReferralOutcome> {
        let amount = amount.unwrap_or(self.config.bonus);
        if amount.is_zero() {
            return Err(GateError::InvalidInput("referral amount must be positive".into()));
        }
        info!(new_user = %new_user_id, operator = %operator, amount = %amount, "Manual referral credit");
        self.credit(new_user_id, amount, CreditSource::Manual(operator.clone()))
    }

    fn reconcile(&self) -> GateResult<ReconcileReport> {
        let mut report = ReconcileReport::default();
        for entry in self.store.pending_credits()? {
            match self.retry(&entry) {
                Ok(RetryResult::Settled) => report.settled += 1,
                Ok(RetryResult::Discarded) => report.discarded += 1,
                Ok(RetryResult::StillPending) => report.still_pending += 1,
                Err(e) => {
                    warn!(new_user = %entry.new_user_id, error = %e, "Reconciliation retry failed");
                    report.still_pending += 1;
                }
            }
        }
        if report != ReconcileReport::default() {
            info!(
                settled = report.settled,
                discarded = report.discarded,
                still_pending = report.still_pending,
                "Referral reconciliation pass"
            );
        }
        Ok(report)
    }
}
