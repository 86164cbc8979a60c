//! # Purchase Lifecycle
//!
//! The one authoritative transition table for purchase records.
//!
//! ```text
//! [Pending] ──approve──→ [Approved] ──revoke──→ [Cancelled]
//!     │
//!     ├──── reject ────→ [Rejected]
//!     │
//!     └──── cancel ────→ [Cancelled]
//! ```
//!
//! `Rejected` and `Cancelled` are dead ends. `Approved` is terminal for every
//! action except `revoke`, which is the privileged operator escape hatch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseStatus {
    /// Submitted, awaiting operator review.
    Pending,
    /// Approved; the record carries the issued access code.
    Approved,
    /// Rejected by an operator.
    Rejected,
    /// Cancelled by the user or an operator, or revoked after approval.
    Cancelled,
}

impl PurchaseStatus {
    /// A record is open while it still blocks a new submission.
    pub fn is_open(self) -> bool {
        matches!(self, PurchaseStatus::Pending)
    }

    /// No action other than `revoke` (from `Approved`) leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Approved => "approved",
            PurchaseStatus::Rejected => "rejected",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision applied to a purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispositionAction {
    Approve,
    Reject,
    /// User- or operator-initiated withdrawal of a pending request.
    Cancel,
    /// Operator withdrawal of an already approved record.
    Revoke,
}

impl DispositionAction {
    /// Status a record ends in after this action succeeds.
    pub fn target_status(self) -> PurchaseStatus {
        match self {
            DispositionAction::Approve => PurchaseStatus::Approved,
            DispositionAction::Reject => PurchaseStatus::Rejected,
            DispositionAction::Cancel | DispositionAction::Revoke => PurchaseStatus::Cancelled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DispositionAction::Approve => "approve",
            DispositionAction::Reject => "reject",
            DispositionAction::Cancel => "cancel",
            DispositionAction::Revoke => "revoke",
        }
    }
}

impl fmt::Display for DispositionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every legal `(from, action) -> to` edge.
pub const TRANSITIONS: &[(PurchaseStatus, DispositionAction, PurchaseStatus)] = &[
    (
        PurchaseStatus::Pending,
        DispositionAction::Approve,
        PurchaseStatus::Approved,
    ),
    (
        PurchaseStatus::Pending,
        DispositionAction::Reject,
        PurchaseStatus::Rejected,
    ),
    (
        PurchaseStatus::Pending,
        DispositionAction::Cancel,
        PurchaseStatus::Cancelled,
    ),
    (
        PurchaseStatus::Approved,
        DispositionAction::Revoke,
        PurchaseStatus::Cancelled,
    ),
];

/// Looks up the status reached by applying `action` in state `from`.
///
/// Returns `None` for every edge missing from [`TRANSITIONS`].
pub fn next_status(from: PurchaseStatus, action: DispositionAction) -> Option<PurchaseStatus> {
    TRANSITIONS
        .iter()
        .find(|(f, a, _)| *f == from && *a == action)
        .map(|(_, _, to)| *to)
}
