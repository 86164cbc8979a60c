//! # Legacy Ingestion
//!
//! Rows exported from the previous store predate the status column: a
//! missing status means the request was never decided and is normalised to
//! `Pending` here, once, so no other code path ever sees a null status.

use serde::{Deserialize, Serialize};
use shared_types::{
    GateError, GateResult, IssuedCode, ProofRef, PurchaseRecord, PurchaseStatus, RecordId,
    Timestamp, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPurchaseRow {
    /// Reused when present so external references stay valid.
    pub id: Option<RecordId>,
    pub user_id: UserId,
    pub proof: String,
    pub status: Option<String>,
    pub issued_code: Option<String>,
    pub acknowledged: Option<bool>,
    pub created_at: Timestamp,
}

impl LegacyPurchaseRow {
    /// Status with the null-means-pending rule applied.
    pub fn normalized_status(&self) -> GateResult<PurchaseStatus> {
        let Some(raw) = self.status.as_deref() else {
            return Ok(PurchaseStatus::Pending);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "pending" => Ok(PurchaseStatus::Pending),
            "approved" => Ok(PurchaseStatus::Approved),
            "rejected" => Ok(PurchaseStatus::Rejected),
            "cancelled" | "canceled" => Ok(PurchaseStatus::Cancelled),
            other => Err(GateError::InvalidInput(format!(
                "unknown legacy status {:?}",
                other
            ))),
        }
    }

    /// Converts the row into a record, enforcing the record invariants.
    pub fn into_record(self) -> GateResult<PurchaseRecord> {
        let status = self.normalized_status()?;
        let proof = ProofRef::new(self.proof);
        if proof.is_empty() {
            return Err(GateError::InvalidInput("legacy row has no proof".into()));
        }
        let issued = self
            .issued_code
            .filter(|code| !code.trim().is_empty())
            .map(|code| IssuedCode::new(code, None));
        PurchaseRecord::imported(
            self.id.unwrap_or_else(RecordId::generate),
            self.user_id,
            proof,
            status,
            issued,
            self.acknowledged.unwrap_or(false),
            self.created_at,
        )
    }
}
