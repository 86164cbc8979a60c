//! # Driving Ports (API - Inbound)

use crate::domain::DispositionRequest;
use async_trait::async_trait;
use shared_types::{AccessCodeSetting, GateResult, OperatorId, ProofRef, PurchaseRecord, RecordId, UserId};

/// Primary lifecycle API: the only path through which purchase records
/// change status and the only writer of issued codes.
#[async_trait]
pub trait DispositionApi: Send + Sync {
    /// Applies an operator decision.
    ///
    /// Re-applying a decision that already committed returns the committed
    /// record without repeating any side effect.
    async fn disposition(&self, request: DispositionRequest) -> GateResult<PurchaseRecord>;

    /// User submits a new purchase.
    async fn submit(&self, user_id: &UserId, proof: ProofRef) -> GateResult<PurchaseRecord>;

    /// User cancels their own pending purchase.
    async fn cancel_by_user(&self, record_id: RecordId, user_id: &UserId)
        -> GateResult<PurchaseRecord>;

    /// User dismisses the current status.
    async fn acknowledge(&self, record_id: RecordId, user_id: &UserId)
        -> GateResult<PurchaseRecord>;

    /// Operator rotates the global access code used by future approvals.
    async fn set_global_code(
        &self,
        code: &str,
        operator: &OperatorId,
    ) -> GateResult<AccessCodeSetting>;
}
