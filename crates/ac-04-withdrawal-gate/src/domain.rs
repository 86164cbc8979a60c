//! Authorization results.

use serde::{Deserialize, Serialize};
use shared_types::Amount;
use thiserror::Error;

/// Why a withdrawal was denied. Surfaced verbatim so the client can route
/// the user (back to the purchase flow for the first two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum DenialReason {
    #[error("no access code has been issued")]
    NoCodeIssued,
    #[error("access code does not match")]
    CodeMismatch,
    #[error("amount exceeds balance")]
    InsufficientBalance,
}

impl DenialReason {
    /// True when the user has to (re)purchase a code.
    pub fn needs_purchase(&self) -> bool {
        matches!(self, DenialReason::NoCodeIssued | DenialReason::CodeMismatch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authorization {
    Authorized,
    Denied(DenialReason),
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Authorization::Authorized)
    }
}

/// Result of a withdrawal that went through the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalOutcome {
    /// Debited; `replayed` when the reference had already been debited.
    Debited { amount: Amount, replayed: bool },
    Denied(DenialReason),
}
