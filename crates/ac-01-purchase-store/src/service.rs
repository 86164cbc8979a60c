//! # Purchase Store Service
//!
//! Every write takes the store's write lock, re-reads the rows it depends
//! on, checks its precondition and commits one atomic batch. That makes each
//! write a compare-and-swap against the durable state:
//!
//! | Write | Precondition checked under the lock |
//! |-------|-------------------------------------|
//! | `submit` / `import_legacy` | no open record for the user |
//! | `cancel` | record is `Pending` and owned by the caller |
//! | `commit_transition` | record version equals the caller's snapshot |
//! | approval of a referred user | link still `Pending`; queues the credit in the same batch |
//! | `confirm_referral` | link is still `Pending` |
//!
//! Reads verify the record and gate invariants on decode and refuse
//! inconsistent rows instead of returning them.

use crate::adapters::codec::{decode, encode};
use crate::domain::keys::KeyPrefix;
use crate::domain::legacy::LegacyPurchaseRow;
use crate::domain::reconciliation::{PendingCredit, PendingCreditKind};
use crate::ports::inbound::PurchaseStoreApi;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use shared_types::{
    AccessCodeSetting, Actor, Amount, CreditSource, GateError, GateResult, OperatorId, ProofRef,
    PurchaseRecord, PurchaseStatus, RecordId, ReferralLink, TimeSource, Timestamp,
    UserGateState, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Effect of a committed transition on the owner's gate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateChange {
    /// Hand the record's issued code to the user.
    Grant(String),
    /// Release the code, but only if this record is its current source.
    /// The gate falls back to the user's most recent remaining approval, or
    /// is cleared when there is none.
    ClearIfSource,
    Unchanged,
}

/// A transition computed from a snapshot at `expected_version`.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub record: PurchaseRecord,
    pub expected_version: u64,
    pub gate: GateChange,
}

#[derive(Debug, Clone)]
pub struct CommittedTransition {
    pub record: PurchaseRecord,
    pub gate: UserGateState,
    pub gate_changed: bool,
}

/// Result of the `Pending -> Confirmed` compare-and-swap on a referral link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This call confirmed the link; an `AwaitingLedger` entry was written.
    Confirmed(ReferralLink),
    /// Someone else confirmed it first.
    AlreadyConfirmed(ReferralLink),
    NoLink,
}

pub struct PurchaseStore<K: KeyValueStore> {
    kv: RwLock<K>,
    time: Arc<dyn TimeSource>,
}

impl<K: KeyValueStore> PurchaseStore<K> {
    pub fn new(kv: K, time: Arc<dyn TimeSource>) -> Self {
        Self {
            kv: RwLock::new(kv),
            time,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    // =========================================================================
    // PURCHASE RECORDS
    // =========================================================================

    /// The user's open record, if any.
    pub fn open_record(&self, user_id: &UserId) -> GateResult<Option<PurchaseRecord>> {
        let kv = self.kv.read();
        match open_record_id(&*kv, user_id)? {
            Some(id) => load_record(&*kv, id).map(Some),
            None => Ok(None),
        }
    }

    /// Applies a transition computed by the disposition engine.
    ///
    /// Fails with `ConcurrencyConflict` if the record moved since the
    /// snapshot the transition was computed from.
    pub fn commit_transition(&self, commit: TransitionCommit) -> GateResult<CommittedTransition> {
        let TransitionCommit {
            record,
            expected_version,
            gate,
        } = commit;

        let mut kv = self.kv.write();
        let current = load_record(&*kv, record.id())?;
        if current.version() != expected_version {
            return Err(GateError::ConcurrencyConflict {
                entity: format!("purchase:{}", record.id()),
                expected: expected_version,
                actual: current.version(),
            });
        }
        if current.user_id() != record.user_id() {
            return Err(GateError::InvalidInput(format!(
                "record {} changed owner",
                record.id()
            )));
        }

        let now = self.time.now();
        let gate_before = load_gate(&*kv, record.user_id())?;
        let gate_after = match &gate {
            GateChange::Grant(code) => Some(gate_before.granted(code.clone(), record.id(), now)),
            GateChange::ClearIfSource if gate_before.is_sourced_from(record.id()) => {
                match latest_approval(&*kv, record.user_id(), record.id())? {
                    Some((source, code)) => Some(gate_before.granted(code, source, now)),
                    None => Some(gate_before.cleared(now)),
                }
            }
            GateChange::ClearIfSource | GateChange::Unchanged => None,
        };

        let mut ops = record_ops(Some(&current), &record)?;
        let approval = current.status() == PurchaseStatus::Pending
            && record.status() == PurchaseStatus::Approved;
        if approval {
            if let Some(entry) = queued_referral_credit(&*kv, &record, now)? {
                ops.push(BatchOperation::put(
                    KeyPrefix::pending_credit_key(record.user_id()),
                    encode(&entry)?,
                ));
            }
        }
        if let Some(state) = &gate_after {
            ops.push(BatchOperation::put(
                KeyPrefix::gate_key(record.user_id()),
                encode(state)?,
            ));
        }
        kv.atomic_batch_write(ops)?;

        info!(
            record_id = %record.id(),
            user_id = %record.user_id(),
            from = %current.status(),
            to = %record.status(),
            version = record.version(),
            gate_changed = gate_after.is_some(),
            "Purchase transition committed"
        );

        let gate_changed = gate_after.is_some();
        Ok(CommittedTransition {
            record,
            gate: gate_after.unwrap_or(gate_before),
            gate_changed,
        })
    }

    /// Ingests a row from the previous store.
    ///
    /// A missing status becomes `Pending`; the open-record rule applies as
    /// for `submit`. An approved row becomes the gate source when the user
    /// has no code yet or the current source was created earlier.
    pub fn import_legacy(&self, row: LegacyPurchaseRow) -> GateResult<PurchaseRecord> {
        let record = row.into_record()?;
        let mut kv = self.kv.write();

        if kv.exists(&KeyPrefix::record_key(record.id()))? {
            return Err(GateError::InvalidInput(format!(
                "record {} already exists",
                record.id()
            )));
        }
        if record.status().is_open() {
            if let Some(existing) = open_record_id(&*kv, record.user_id())? {
                return Err(GateError::AlreadyPending {
                    user_id: record.user_id().clone(),
                    existing,
                });
            }
        }

        let mut ops = record_ops(None, &record)?;
        if let Some(code) = record.issued_code() {
            let gate = load_gate(&*kv, record.user_id())?;
            let newer = match gate.source_record() {
                Some(source) => load_record(&*kv, source)?.created_at() < record.created_at(),
                None => true,
            };
            if newer {
                let granted = gate.granted(code, record.id(), self.time.now());
                ops.push(BatchOperation::put(
                    KeyPrefix::gate_key(record.user_id()),
                    encode(&granted)?,
                ));
            }
        }
        kv.atomic_batch_write(ops)?;

        info!(
            record_id = %record.id(),
            user_id = %record.user_id(),
            status = %record.status(),
            "Legacy purchase imported"
        );
        Ok(record)
    }

    // =========================================================================
    // GATE STATE
    // =========================================================================

    /// Current gate state; empty for users who never held a code.
    pub fn gate_state(&self, user_id: &UserId) -> GateResult<UserGateState> {
        load_gate(&*self.kv.read(), user_id)
    }

    /// Runs `f` against the gate state while holding the write lock, so no
    /// transition can change the code until `f` returns.
    pub fn with_gate_locked<T>(
        &self,
        user_id: &UserId,
        f: impl FnOnce(&UserGateState) -> GateResult<T>,
    ) -> GateResult<T> {
        let kv = self.kv.write();
        let gate = load_gate(&*kv, user_id)?;
        f(&gate)
    }

    // =========================================================================
    // REFERRALS
    // =========================================================================

    pub fn register_referral(
        &self,
        referrer_id: &UserId,
        new_user_id: &UserId,
    ) -> GateResult<ReferralLink> {
        if referrer_id == new_user_id {
            return Err(GateError::Referral(format!(
                "user {} cannot refer themselves",
                new_user_id
            )));
        }
        let mut kv = self.kv.write();
        if let Some(existing) = load_referral(&*kv, new_user_id)? {
            return Err(GateError::Referral(format!(
                "user {} was already referred by {}",
                new_user_id, existing.referrer_id
            )));
        }
        let link = ReferralLink::new(referrer_id.clone(), new_user_id.clone(), self.time.now());
        kv.put(&KeyPrefix::referral_key(new_user_id), &encode(&link)?)?;
        info!(referrer = %referrer_id, new_user = %new_user_id, "Referral link registered");
        Ok(link)
    }

    pub fn referral(&self, new_user_id: &UserId) -> GateResult<Option<ReferralLink>> {
        load_referral(&*self.kv.read(), new_user_id)
    }

    /// Compare-and-swap `Pending -> Confirmed` on the link of `new_user_id`.
    ///
    /// The confirmation and its `AwaitingLedger` outbox entry are one batch.
    pub fn confirm_referral(
        &self,
        new_user_id: &UserId,
        amount: Amount,
        source: CreditSource,
    ) -> GateResult<ConfirmOutcome> {
        let mut kv = self.kv.write();
        let Some(link) = load_referral(&*kv, new_user_id)? else {
            return Ok(ConfirmOutcome::NoLink);
        };
        let now = self.time.now();
        let Some(confirmed) = link.confirmed(amount, source.clone(), now) else {
            debug!(new_user = %new_user_id, "Referral already confirmed");
            return Ok(ConfirmOutcome::AlreadyConfirmed(link));
        };

        let outbox = PendingCredit::new(
            new_user_id.clone(),
            PendingCreditKind::AwaitingLedger {
                referrer_id: confirmed.referrer_id.clone(),
                amount,
            },
            source,
            now,
        );
        kv.atomic_batch_write(vec![
            BatchOperation::put(KeyPrefix::referral_key(new_user_id), encode(&confirmed)?),
            BatchOperation::put(KeyPrefix::pending_credit_key(new_user_id), encode(&outbox)?),
        ])?;
        Ok(ConfirmOutcome::Confirmed(confirmed))
    }

    // =========================================================================
    // RECONCILIATION OUTBOX
    // =========================================================================

    pub fn record_pending_credit(&self, entry: &PendingCredit) -> GateResult<()> {
        let mut kv = self.kv.write();
        kv.put(&KeyPrefix::pending_credit_key(&entry.new_user_id), &encode(entry)?)?;
        warn!(
            new_user = %entry.new_user_id,
            attempts = entry.attempts,
            error = entry.last_error.as_deref().unwrap_or(""),
            "Referral credit left for reconciliation"
        );
        Ok(())
    }

    pub fn pending_credit(&self, new_user_id: &UserId) -> GateResult<Option<PendingCredit>> {
        let kv = self.kv.read();
        kv.get(&KeyPrefix::pending_credit_key(new_user_id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Drops the user's entry if the link was never confirmed through it.
    ///
    /// An `AwaitingLedger` entry is left alone: it belongs to whichever
    /// attempt confirmed the link.
    pub fn discard_unconfirmed_credit(&self, new_user_id: &UserId) -> GateResult<bool> {
        let mut kv = self.kv.write();
        let key = KeyPrefix::pending_credit_key(new_user_id);
        let Some(bytes) = kv.get(&key)? else {
            return Ok(false);
        };
        let entry: PendingCredit = decode(&bytes)?;
        if !entry.is_unconfirmed() {
            return Ok(false);
        }
        kv.delete(&key)?;
        Ok(true)
    }

    pub fn pending_credits(&self) -> GateResult<Vec<PendingCredit>> {
        let kv = self.kv.read();
        kv.prefix_scan(KeyPrefix::PendingCredit.as_bytes())?
            .into_iter()
            .map(|(_, bytes)| decode(&bytes))
            .collect()
    }

    /// Removes the outbox entry once the ledger has the credit.
    pub fn settle_credit(&self, new_user_id: &UserId) -> GateResult<()> {
        let mut kv = self.kv.write();
        kv.delete(&KeyPrefix::pending_credit_key(new_user_id))?;
        Ok(())
    }

    // =========================================================================
    // GLOBAL ACCESS CODE
    // =========================================================================

    pub fn global_code(&self) -> GateResult<Option<AccessCodeSetting>> {
        let kv = self.kv.read();
        kv.get(&KeyPrefix::access_code_key())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// Writes the next version of the global code. Existing records keep the
    /// code they were stamped with.
    pub fn set_global_code(
        &self,
        code: &str,
        operator: &OperatorId,
    ) -> GateResult<AccessCodeSetting> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GateError::InvalidInput("access code must not be empty".into()));
        }
        let mut kv = self.kv.write();
        let previous: Option<AccessCodeSetting> = kv
            .get(&KeyPrefix::access_code_key())?
            .map(|bytes| decode(&bytes))
            .transpose()?;
        let setting = AccessCodeSetting {
            version: previous.map_or(1, |p| p.version + 1),
            code: code.to_string(),
            updated_by: operator.clone(),
            updated_at: self.time.now(),
        };
        kv.put(&KeyPrefix::access_code_key(), &encode(&setting)?)?;
        info!(version = setting.version, operator = %operator, "Global access code updated");
        Ok(setting)
    }

    fn records_by_index(&self, prefix: &[u8]) -> GateResult<Vec<PurchaseRecord>> {
        let kv = self.kv.read();
        kv.prefix_scan(prefix)?
            .into_iter()
            .map(|(_, id)| load_record(&*kv, record_id_from(&id)?))
            .collect()
    }
}

impl<K: KeyValueStore> PurchaseStoreApi for PurchaseStore<K> {
    fn submit(&self, user_id: &UserId, proof: ProofRef) -> GateResult<PurchaseRecord> {
        if proof.is_empty() {
            return Err(GateError::InvalidInput("proof reference is empty".into()));
        }
        let mut kv = self.kv.write();
        if let Some(existing) = open_record_id(&*kv, user_id)? {
            debug!(user_id = %user_id, existing = %existing, "Submission refused, record open");
            return Err(GateError::AlreadyPending {
                user_id: user_id.clone(),
                existing,
            });
        }

        let record =
            PurchaseRecord::new_pending(RecordId::generate(), user_id.clone(), proof, self.now());
        kv.atomic_batch_write(record_ops(None, &record)?)?;

        info!(record_id = %record.id(), user_id = %user_id, "Purchase submitted");
        Ok(record)
    }

    fn get(&self, id: RecordId) -> GateResult<PurchaseRecord> {
        load_record(&*self.kv.read(), id)
    }

    fn latest_for_user(
        &self,
        user_id: &UserId,
        status: Option<PurchaseStatus>,
    ) -> GateResult<Option<PurchaseRecord>> {
        Ok(self
            .history_for_user(user_id)?
            .into_iter()
            .find(|r| status.map_or(true, |s| r.status() == s)))
    }

    fn history_for_user(&self, user_id: &UserId) -> GateResult<Vec<PurchaseRecord>> {
        let mut records = self.records_by_index(&KeyPrefix::history_prefix(user_id))?;
        records.reverse();
        Ok(records)
    }

    fn list_by_status(&self, status: PurchaseStatus) -> GateResult<Vec<PurchaseRecord>> {
        self.records_by_index(&KeyPrefix::status_prefix(status))
    }

    fn cancel(&self, id: RecordId, by_user: &UserId) -> GateResult<PurchaseRecord> {
        let mut kv = self.kv.write();
        let current = load_record(&*kv, id)?;
        let next = current.cancelled(Actor::User(by_user.clone()), None, self.now())?;
        kv.atomic_batch_write(record_ops(Some(&current), &next)?)?;

        info!(record_id = %id, user_id = %by_user, "Purchase cancelled by owner");
        Ok(next)
    }

    fn acknowledge(&self, id: RecordId, by_user: &UserId) -> GateResult<PurchaseRecord> {
        let mut kv = self.kv.write();
        let current = load_record(&*kv, id)?;
        if current.acknowledged() && current.user_id() == by_user {
            return Ok(current);
        }
        let next = current.acknowledged_by(by_user)?;
        kv.atomic_batch_write(record_ops(Some(&current), &next)?)?;

        debug!(record_id = %id, status = %next.status(), "Purchase acknowledged");
        Ok(next)
    }
}

// =============================================================================
// ROW HELPERS
// =============================================================================

fn load_record<K: KeyValueStore>(kv: &K, id: RecordId) -> GateResult<PurchaseRecord> {
    let bytes = kv
        .get(&KeyPrefix::record_key(id))?
        .ok_or(GateError::NotFound(id))?;
    let record: PurchaseRecord = decode(&bytes)?;
    if !record.is_consistent() {
        return Err(GateError::Serialization(format!(
            "record {} violates the issued-code invariant",
            id
        )));
    }
    Ok(record)
}

fn load_gate<K: KeyValueStore>(kv: &K, user_id: &UserId) -> GateResult<UserGateState> {
    let Some(bytes) = kv.get(&KeyPrefix::gate_key(user_id))? else {
        return Ok(UserGateState::empty(user_id.clone()));
    };
    let gate: UserGateState = decode(&bytes)?;
    if !gate.is_consistent() || gate.user_id() != user_id {
        return Err(GateError::Serialization(format!(
            "gate state of {} is inconsistent",
            user_id
        )));
    }
    Ok(gate)
}

fn load_referral<K: KeyValueStore>(kv: &K, new_user: &UserId) -> GateResult<Option<ReferralLink>> {
    kv.get(&KeyPrefix::referral_key(new_user))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

/// Outbox entry for the referral credit an approval of `record` owes, if any.
fn queued_referral_credit<K: KeyValueStore>(
    kv: &K,
    record: &PurchaseRecord,
    now: Timestamp,
) -> GateResult<Option<PendingCredit>> {
    let owes_credit = load_referral(kv, record.user_id())?.is_some_and(|link| link.is_pending());
    if !owes_credit || kv.exists(&KeyPrefix::pending_credit_key(record.user_id()))? {
        return Ok(None);
    }
    Ok(Some(PendingCredit::new(
        record.user_id().clone(),
        PendingCreditKind::AwaitingConfirmation,
        CreditSource::Approval(Some(record.id())),
        now,
    )))
}

/// Most recently approved record of `user_id` other than `excluding`.
fn latest_approval<K: KeyValueStore>(
    kv: &K,
    user_id: &UserId,
    excluding: RecordId,
) -> GateResult<Option<(RecordId, String)>> {
    let mut latest: Option<PurchaseRecord> = None;
    // History is oldest first, so on equal timestamps the later record wins.
    for (_, id) in kv.prefix_scan(&KeyPrefix::history_prefix(user_id))? {
        let record = load_record(kv, record_id_from(&id)?)?;
        if record.id() == excluding || record.status() != PurchaseStatus::Approved {
            continue;
        }
        if latest
            .as_ref()
            .map_or(true, |l| record.last_transition_at() >= l.last_transition_at())
        {
            latest = Some(record);
        }
    }
    Ok(latest.and_then(|r| r.issued_code().map(|code| (r.id(), code.to_string()))))
}

fn open_record_id<K: KeyValueStore>(kv: &K, user_id: &UserId) -> GateResult<Option<RecordId>> {
    kv.get(&KeyPrefix::open_key(user_id))?
        .map(|bytes| record_id_from(&bytes))
        .transpose()
}

fn record_id_from(bytes: &[u8]) -> GateResult<RecordId> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| GateError::Serialization("record id must be 16 bytes".into()))?;
    Ok(RecordId::from_bytes(raw))
}

/// Record row plus every index that depends on its status.
fn record_ops(
    previous: Option<&PurchaseRecord>,
    next: &PurchaseRecord,
) -> GateResult<Vec<BatchOperation>> {
    let id = next.id();
    let mut ops = vec![BatchOperation::put(KeyPrefix::record_key(id), encode(next)?)];

    if previous.is_none() {
        ops.push(BatchOperation::put(
            KeyPrefix::history_key(next.user_id(), next.created_at(), id),
            id.as_bytes().to_vec(),
        ));
    }

    let previous_status = previous.map(PurchaseRecord::status);
    if previous_status != Some(next.status()) {
        if let Some(status) = previous_status {
            ops.push(BatchOperation::delete(KeyPrefix::status_key(
                status,
                next.created_at(),
                id,
            )));
        }
        ops.push(BatchOperation::put(
            KeyPrefix::status_key(next.status(), next.created_at(), id),
            id.as_bytes().to_vec(),
        ));
    }

    let was_open = previous_status.is_some_and(PurchaseStatus::is_open);
    match (was_open, next.status().is_open()) {
        (false, true) => ops.push(BatchOperation::put(
            KeyPrefix::open_key(next.user_id()),
            id.as_bytes().to_vec(),
        )),
        (true, false) => ops.push(BatchOperation::delete(KeyPrefix::open_key(next.user_id()))),
        _ => {}
    }
    Ok(ops)
}
