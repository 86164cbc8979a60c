//! # Error Types
//!
//! The error taxonomy shared by every access-gate subsystem.
//!
//! | Variant | Retry policy |
//! |---------|--------------|
//! | `InvalidTransition` | never retried, surfaced to the caller |
//! | `AlreadyPending` | never retried |
//! | `ConcurrencyConflict` | retry once after re-reading current state |
//! | `Storage` / `Serialization` / `Ledger` | fatal to the request |

use crate::entities::{RecordId, UserId};
use crate::lifecycle::{DispositionAction, PurchaseStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a requested transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionViolation {
    /// The transition table has no edge for `(from, action)`.
    IllegalFromState,
    /// A user tried to cancel a record they do not own.
    NotOwner,
    /// The action was already applied, but the replay asks for a different
    /// outcome (e.g. a different issued code).
    ConflictingReplay,
}

impl fmt::Display for TransitionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionViolation::IllegalFromState => f.write_str("illegal from current state"),
            TransitionViolation::NotOwner => f.write_str("caller does not own the record"),
            TransitionViolation::ConflictingReplay => {
                f.write_str("replay conflicts with committed outcome")
            }
        }
    }
}

/// Errors surfaced by the purchase lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// Purchase record not found.
    #[error("Purchase record not found: {0}")]
    NotFound(RecordId),

    /// The user already has an open purchase record.
    #[error("User {user_id} already has an open purchase: {existing}")]
    AlreadyPending { user_id: UserId, existing: RecordId },

    /// State machine violation.
    #[error("Invalid transition on {record_id}: cannot {action} from {from} ({violation})")]
    InvalidTransition {
        record_id: RecordId,
        from: PurchaseStatus,
        action: DispositionAction,
        violation: TransitionViolation,
    },

    /// Lost a compare-and-swap race.
    #[error("Concurrency conflict on {entity}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    /// Referral bookkeeping refused the request (self-referral, duplicate link).
    #[error("Referral rejected: {0}")]
    Referral(String),

    /// Caller supplied an unusable value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The durable store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored bytes could not be decoded, or decoded into an inconsistent value.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The balance ledger failed.
    #[error("Ledger error: {0}")]
    Ledger(String),
}

impl GateError {
    /// True for the one error class that may be retried after a re-read.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GateError::ConcurrencyConflict { .. })
    }

    /// Shorthand for an illegal `(from, action)` edge.
    pub fn illegal(record_id: RecordId, from: PurchaseStatus, action: DispositionAction) -> Self {
        GateError::InvalidTransition {
            record_id,
            from,
            action,
            violation: TransitionViolation::IllegalFromState,
        }
    }
}

/// Result type for lifecycle operations.
pub type GateResult<T> = Result<T, GateError>;
