//! # Inbound Ports (Driving Ports)
//!
//! Record-level API offered to user-facing handlers. Operator dispositions
//! go through the disposition engine, which commits via
//! `PurchaseStore::commit_transition`.

use shared_types::{GateResult, ProofRef, PurchaseRecord, PurchaseStatus, RecordId, UserId};

pub trait PurchaseStoreApi: Send + Sync {
    /// Creates a `Pending` record; fails with `AlreadyPending` if the user
    /// already has one open.
    fn submit(&self, user_id: &UserId, proof: ProofRef) -> GateResult<PurchaseRecord>;

    fn get(&self, id: RecordId) -> GateResult<PurchaseRecord>;

    /// Most recent record of `user_id`, optionally restricted to one status.
    fn latest_for_user(
        &self,
        user_id: &UserId,
        status: Option<PurchaseStatus>,
    ) -> GateResult<Option<PurchaseRecord>>;

    /// Every record of `user_id`, newest first.
    fn history_for_user(&self, user_id: &UserId) -> GateResult<Vec<PurchaseRecord>>;

    /// Operator queue: every record in `status`, oldest first.
    fn list_by_status(&self, status: PurchaseStatus) -> GateResult<Vec<PurchaseRecord>>;

    /// Owner cancels their own `Pending` record.
    fn cancel(&self, id: RecordId, by_user: &UserId) -> GateResult<PurchaseRecord>;

    /// Owner marks the current status as seen.
    fn acknowledge(&self, id: RecordId, by_user: &UserId) -> GateResult<PurchaseRecord>;
}
