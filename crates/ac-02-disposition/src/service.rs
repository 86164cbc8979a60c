//! # Disposition Engine
//!
//! ```text
//!              ┌─────────────── disposition(request) ───────────────┐
//!              ▼                                                    │
//!   read record ──► already applied? ──yes──► return committed (no side effects)
//!              │
//!              no
//!              ▼
//!   transition via table ──illegal──► InvalidTransition
//!              │
//!              ▼
//!   commit (version CAS, record + gate in one batch)
//!              │                 └──conflict──► re-read once, start over
//!              ▼
//!   approve only: referral credit (best-effort)
//!              ▼
//!   publish status event (fire-and-forget)
//! ```
//!
//! Only the caller that wins the commit runs side effects. A concurrent
//! duplicate approval loses the version check, re-reads, finds the approval
//! already applied and returns it unchanged.

use crate::domain::{generate_code, CodePolicy, DispositionRequest};
use crate::ports::inbound::DispositionApi;
use crate::ports::outbound::{ReferralCreditPort, ReferralCreditResult};
use ac_01_purchase_store::{
    CommittedTransition, GateChange, KeyValueStore, PurchaseStore, PurchaseStoreApi,
    TransitionCommit,
};
use async_trait::async_trait;
use shared_bus::{EventPublisher, GateEvent, StatusChange};
use shared_types::{
    AccessCodeSetting, Actor, CreditSource, DispositionAction, GateError, GateResult, IssuedCode,
    OperatorId, ProofRef, PurchaseRecord, PurchaseStatus, RecordId, TransitionViolation, UserId,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct DispositionEngine<K: KeyValueStore> {
    store: Arc<PurchaseStore<K>>,
    referral: Arc<dyn ReferralCreditPort>,
    publisher: Arc<dyn EventPublisher>,
    policy: CodePolicy,
}

impl<K: KeyValueStore> DispositionEngine<K> {
    pub fn new(
        store: Arc<PurchaseStore<K>>,
        referral: Arc<dyn ReferralCreditPort>,
        publisher: Arc<dyn EventPublisher>,
        policy: CodePolicy,
    ) -> Self {
        Self {
            store,
            referral,
            publisher,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<PurchaseStore<K>> {
        &self.store
    }

    pub fn policy(&self) -> CodePolicy {
        self.policy
    }

    /// One read-transition-commit pass.
    async fn attempt(&self, request: &DispositionRequest) -> GateResult<PurchaseRecord> {
        let current = self.store.get(request.record_id)?;

        if current.has_applied(request.action) {
            return self.replay(&current, request);
        }

        let (next, gate) = self.transition(&current, request)?;
        let committed = self.store.commit_transition(TransitionCommit {
            record: next,
            expected_version: current.version(),
            gate,
        })?;

        self.after_commit(current.status(), &committed).await;
        Ok(committed.record)
    }

    fn replay(
        &self,
        current: &PurchaseRecord,
        request: &DispositionRequest,
    ) -> GateResult<PurchaseRecord> {
        if request.action == DispositionAction::Approve {
            if let Some(code) = request.code_override() {
                if current.issued_code() != Some(code) {
                    return Err(GateError::InvalidTransition {
                        record_id: current.id(),
                        from: current.status(),
                        action: request.action,
                        violation: TransitionViolation::ConflictingReplay,
                    });
                }
            }
        }
        debug!(
            record_id = %current.id(),
            action = %request.action,
            version = current.version(),
            "Disposition already applied, returning committed record"
        );
        Ok(current.clone())
    }

    fn transition(
        &self,
        current: &PurchaseRecord,
        request: &DispositionRequest,
    ) -> GateResult<(PurchaseRecord, GateChange)> {
        let now = self.store.now();
        let note = request.note.clone();
        let operator = &request.operator;

        match request.action {
            DispositionAction::Approve => {
                // Legality first, so an illegal approve never consumes a code.
                if current.status() != PurchaseStatus::Pending {
                    return Err(GateError::illegal(
                        current.id(),
                        current.status(),
                        request.action,
                    ));
                }
                let issued = self.issue_code(request)?;
                let code = issued.code.clone();
                let next = current.approved(issued, operator, note, now)?;
                Ok((next, GateChange::Grant(code)))
            }
            DispositionAction::Reject => Ok((
                current.rejected(operator, note, now)?,
                GateChange::Unchanged,
            )),
            DispositionAction::Cancel => Ok((
                current.cancelled(Actor::Operator(operator.clone()), note, now)?,
                GateChange::Unchanged,
            )),
            DispositionAction::Revoke => Ok((
                current.revoked(operator, note, now)?,
                GateChange::ClearIfSource,
            )),
        }
    }

    fn issue_code(&self, request: &DispositionRequest) -> GateResult<IssuedCode> {
        if let Some(code) = request.code_override() {
            return Ok(IssuedCode::new(code, None));
        }
        match self.policy {
            CodePolicy::Configured => {
                let setting = self.store.global_code()?.ok_or_else(|| {
                    GateError::InvalidInput("no global access code configured".into())
                })?;
                Ok(IssuedCode::new(setting.code, Some(setting.version)))
            }
            CodePolicy::Generated { len } => Ok(IssuedCode::new(generate_code(len), None)),
        }
    }

    async fn after_commit(&self, previous: PurchaseStatus, committed: &CommittedTransition) {
        let record = &committed.record;

        if record.last_action() == Some(DispositionAction::Approve) {
            self.credit_referral(record).await;
        }

        self.publisher
            .publish(GateEvent::PurchaseStatusChanged(StatusChange::transitioned(
                previous, record,
            )))
            .await;
    }

    /// Never fails the approval; failures are left to reconciliation.
    async fn credit_referral(&self, record: &PurchaseRecord) {
        match self.referral.try_credit(record.user_id(), record.id()) {
            Ok(ReferralCreditResult::Credited {
                referrer_id,
                amount,
            }) => {
                info!(
                    new_user = %record.user_id(),
                    referrer = %referrer_id,
                    amount = %amount,
                    "Referral bonus credited"
                );
                self.publisher
                    .publish(GateEvent::ReferralCredited {
                        referrer_id,
                        new_user_id: record.user_id().clone(),
                        amount,
                        source: CreditSource::Approval(Some(record.id())),
                    })
                    .await;
            }
            Ok(ReferralCreditResult::Deferred { reason }) => {
                warn!(
                    new_user = %record.user_id(),
                    reason = %reason,
                    "Referral credit deferred to reconciliation"
                );
            }
            Ok(outcome) => {
                debug!(new_user = %record.user_id(), outcome = ?outcome, "No referral credit due");
            }
            Err(e) => {
                error!(
                    new_user = %record.user_id(),
                    record_id = %record.id(),
                    error = %e,
                    "Referral credit failed"
                );
            }
        }
    }
}

#[async_trait]
impl<K: KeyValueStore + 'static> DispositionApi for DispositionEngine<K> {
    async fn disposition(&self, request: DispositionRequest) -> GateResult<PurchaseRecord> {
        match self.attempt(&request).await {
            Err(e) if e.is_retryable() => {
                debug!(
                    record_id = %request.record_id,
                    action = %request.action,
                    error = %e,
                    "Lost commit race, re-reading"
                );
                self.attempt(&request).await
            }
            other => other,
        }
    }

    async fn submit(&self, user_id: &UserId, proof: ProofRef) -> GateResult<PurchaseRecord> {
        let record = self.store.submit(user_id, proof)?;
        self.publisher
            .publish(GateEvent::PurchaseStatusChanged(StatusChange::submitted(
                &record,
            )))
            .await;
        Ok(record)
    }

    async fn cancel_by_user(
        &self,
        record_id: RecordId,
        user_id: &UserId,
    ) -> GateResult<PurchaseRecord> {
        let record = self.store.cancel(record_id, user_id)?;
        self.publisher
            .publish(GateEvent::PurchaseStatusChanged(StatusChange::transitioned(
                PurchaseStatus::Pending,
                &record,
            )))
            .await;
        Ok(record)
    }

    async fn acknowledge(
        &self,
        record_id: RecordId,
        user_id: &UserId,
    ) -> GateResult<PurchaseRecord> {
        let before = self.store.get(record_id)?;
        let record = self.store.acknowledge(record_id, user_id)?;
        if record.version() != before.version() {
            self.publisher
                .publish(GateEvent::PurchaseAcknowledged {
                    record_id,
                    user_id: user_id.clone(),
                    record_version: record.version(),
                })
                .await;
        }
        Ok(record)
    }

    async fn set_global_code(
        &self,
        code: &str,
        operator: &OperatorId,
    ) -> GateResult<AccessCodeSetting> {
        let setting = self.store.set_global_code(code, operator)?;
        self.publisher
            .publish(GateEvent::AccessCodeRotated {
                version: setting.version,
                updated_by: setting.updated_by.clone(),
                updated_at: setting.updated_at,
            })
            .await;
        Ok(setting)
    }
}
