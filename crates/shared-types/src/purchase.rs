//! # Purchase Record
//!
//! Durable record of one access-code purchase attempt.
//!
//! ## Invariants
//!
//! - `issued_code.is_some() == (status == Approved)`
//! - `user_id` never changes after creation
//! - `version` increases by exactly one on every committed write
//!
//! Fields are private: the only way to change a record is through the
//! transition methods below, each of which consults the transition table.

use crate::entities::{Actor, OperatorId, ProofRef, RecordId, UserId};
use crate::errors::{GateError, GateResult, TransitionViolation};
use crate::lifecycle::{next_status, DispositionAction, PurchaseStatus};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Access code stamped onto an approved record.
///
/// `config_version` is the version of the global access-code setting the code
/// came from, or `None` for generated and overridden codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCode {
    pub code: String,
    pub config_version: Option<u64>,
}

impl IssuedCode {
    pub fn new(code: impl Into<String>, config_version: Option<u64>) -> Self {
        Self {
            code: code.into(),
            config_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    id: RecordId,
    user_id: UserId,
    submitted_proof: ProofRef,
    status: PurchaseStatus,
    issued_code: Option<IssuedCode>,
    acknowledged: bool,
    created_at: Timestamp,
    last_transition_at: Timestamp,
    version: u64,
    last_action: Option<DispositionAction>,
    decided_by: Option<Actor>,
    note: Option<String>,
}

impl PurchaseRecord {
    /// Creates a new pending record. This is the only constructor.
    pub fn new_pending(id: RecordId, user_id: UserId, proof: ProofRef, now: Timestamp) -> Self {
        Self {
            id,
            user_id,
            submitted_proof: proof,
            status: PurchaseStatus::Pending,
            issued_code: None,
            acknowledged: false,
            created_at: now,
            last_transition_at: now,
            version: 1,
            last_action: None,
            decided_by: None,
            note: None,
        }
    }

    /// Rebuilds a record carried over from an older store.
    ///
    /// The row must already satisfy `issued_code <=> Approved`. A decided row
    /// records the action that produced its status, so replaying that
    /// decision is recognised.
    pub fn imported(
        id: RecordId,
        user_id: UserId,
        proof: ProofRef,
        status: PurchaseStatus,
        issued_code: Option<IssuedCode>,
        acknowledged: bool,
        created_at: Timestamp,
    ) -> GateResult<Self> {
        if issued_code.as_ref().is_some_and(|c| c.code.trim().is_empty()) {
            return Err(GateError::InvalidInput("issued code must not be empty".into()));
        }
        let last_action = match status {
            PurchaseStatus::Pending => None,
            PurchaseStatus::Approved => Some(DispositionAction::Approve),
            PurchaseStatus::Rejected => Some(DispositionAction::Reject),
            PurchaseStatus::Cancelled => Some(DispositionAction::Cancel),
        };
        let record = Self {
            id,
            user_id,
            submitted_proof: proof,
            status,
            issued_code,
            acknowledged,
            created_at,
            last_transition_at: created_at,
            version: 1,
            last_action,
            decided_by: None,
            note: None,
        };
        if !record.is_consistent() {
            return Err(GateError::InvalidInput(format!(
                "record {} is {} but issued code presence disagrees",
                id, status
            )));
        }
        Ok(record)
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn submitted_proof(&self) -> &ProofRef {
        &self.submitted_proof
    }

    pub fn status(&self) -> PurchaseStatus {
        self.status
    }

    /// The issued access code, present only while `Approved`.
    pub fn issued_code(&self) -> Option<&str> {
        self.issued_code.as_ref().map(|c| c.code.as_str())
    }

    pub fn issued(&self) -> Option<&IssuedCode> {
        self.issued_code.as_ref()
    }

    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn last_transition_at(&self) -> Timestamp {
        self.last_transition_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_action(&self) -> Option<DispositionAction> {
        self.last_action
    }

    pub fn decided_by(&self) -> Option<&Actor> {
        self.decided_by.as_ref()
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Checks the `issued_code <=> Approved` invariant.
    ///
    /// Always true for records built through this API; used to reject
    /// corrupted or hand-edited rows on read.
    pub fn is_consistent(&self) -> bool {
        self.issued_code.is_some() == (self.status == PurchaseStatus::Approved)
            && self.version >= 1
    }

    /// Whether `action` has already been committed on this record.
    pub fn has_applied(&self, action: DispositionAction) -> bool {
        self.last_action == Some(action) && self.status == action.target_status()
    }

    fn check(&self, action: DispositionAction) -> GateResult<PurchaseStatus> {
        next_status(self.status, action)
            .ok_or_else(|| GateError::illegal(self.id, self.status, action))
    }

    fn advanced(
        &self,
        action: DispositionAction,
        status: PurchaseStatus,
        by: Actor,
        note: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            status,
            // Every status change must be surfaced again in the client.
            acknowledged: false,
            last_transition_at: now,
            version: self.version + 1,
            last_action: Some(action),
            decided_by: Some(by),
            note,
            ..self.clone()
        }
    }

    /// `Pending -> Approved`, stamping the issued code.
    pub fn approved(
        &self,
        code: IssuedCode,
        operator: &OperatorId,
        note: Option<String>,
        now: Timestamp,
    ) -> GateResult<Self> {
        let status = self.check(DispositionAction::Approve)?;
        if code.code.trim().is_empty() {
            return Err(GateError::InvalidInput("issued code must not be empty".into()));
        }
        let mut next = self.advanced(
            DispositionAction::Approve,
            status,
            Actor::Operator(operator.clone()),
            note,
            now,
        );
        next.issued_code = Some(code);
        Ok(next)
    }

    /// `Pending -> Rejected`.
    pub fn rejected(
        &self,
        operator: &OperatorId,
        note: Option<String>,
        now: Timestamp,
    ) -> GateResult<Self> {
        let status = self.check(DispositionAction::Reject)?;
        Ok(self.advanced(
            DispositionAction::Reject,
            status,
            Actor::Operator(operator.clone()),
            note,
            now,
        ))
    }

    /// `Pending -> Cancelled`, by the owning user or an operator.
    pub fn cancelled(&self, by: Actor, note: Option<String>, now: Timestamp) -> GateResult<Self> {
        if let Actor::User(user) = &by {
            if user != &self.user_id {
                return Err(GateError::InvalidTransition {
                    record_id: self.id,
                    from: self.status,
                    action: DispositionAction::Cancel,
                    violation: TransitionViolation::NotOwner,
                });
            }
        }
        let status = self.check(DispositionAction::Cancel)?;
        Ok(self.advanced(DispositionAction::Cancel, status, by, note, now))
    }

    /// `Approved -> Cancelled`, nulling the issued code.
    pub fn revoked(
        &self,
        operator: &OperatorId,
        note: Option<String>,
        now: Timestamp,
    ) -> GateResult<Self> {
        let status = self.check(DispositionAction::Revoke)?;
        let mut next = self.advanced(
            DispositionAction::Revoke,
            status,
            Actor::Operator(operator.clone()),
            note,
            now,
        );
        next.issued_code = None;
        Ok(next)
    }

    /// Marks the current status as seen by the owner. Status is untouched.
    pub fn acknowledged_by(&self, user: &UserId) -> GateResult<Self> {
        if user != &self.user_id {
            return Err(GateError::InvalidInput(format!(
                "user {} cannot acknowledge record {}",
                user, self.id
            )));
        }
        Ok(Self {
            acknowledged: true,
            version: self.version + 1,
            ..self.clone()
        })
    }
}
