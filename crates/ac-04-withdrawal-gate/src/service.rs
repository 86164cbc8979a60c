//! # Withdrawal Gate Service
//!
//! ```text
//!  authorize(user, code, amount)          withdraw(user, code, amount, ref)
//!        │                                      │
//!        ▼                                      ▼
//!   gate_state(user)                      with_gate_locked(user) ──┐
//!        │                                      │                  │ no transition
//!        ▼                                      ▼                  │ can commit
//!   check_code ── Denied(..)              check_code ── Denied(..) │
//!        │                                      │                  │
//!        ▼                                      ▼                  │
//!   ledger.balance ── Denied(Insufficient) ledger.debit ───────────┘
//!        │                                      │
//!        ▼                                      ▼
//!    Authorized                          Debited | Denied(Insufficient)
//! ```

use crate::domain::{Authorization, DenialReason, WithdrawalOutcome};
use crate::ports::{BalanceLedger, WithdrawalGateApi};
use ac_01_purchase_store::{KeyValueStore, PurchaseStore};
use shared_types::{
    Amount, CreditOutcome, GateError, GateResult, LedgerEntryRef, LedgerError, UserGateState,
    UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LEDGER_REASON: &str = "withdrawal";

pub struct WithdrawalGate<K: KeyValueStore> {
    store: Arc<PurchaseStore<K>>,
    ledger: Arc<dyn BalanceLedger>,
}

impl<K: KeyValueStore> WithdrawalGate<K> {
    pub fn new(store: Arc<PurchaseStore<K>>, ledger: Arc<dyn BalanceLedger>) -> Self {
        Self { store, ledger }
    }

    /// Ledger reference of a withdrawal; one debit per user and reference.
    pub fn ledger_reference(user_id: &UserId, reference: &str) -> String {
        format!("withdrawal:{}:{}", user_id, reference)
    }
}

/// First two checks. Exact byte comparison: no trimming, no case folding.
fn check_code(gate: &UserGateState, supplied: &str) -> Option<DenialReason> {
    match gate.access_code() {
        None => Some(DenialReason::NoCodeIssued),
        Some(code) if code != supplied => Some(DenialReason::CodeMismatch),
        Some(_) => None,
    }
}

fn require_positive(amount: Amount) -> GateResult<()> {
    if amount.is_zero() {
        return Err(GateError::InvalidInput(
            "withdrawal amount must be positive".into(),
        ));
    }
    Ok(())
}

fn ledger_error(e: LedgerError) -> GateError {
    GateError::Ledger(e.to_string())
}

impl<K: KeyValueStore> WithdrawalGateApi for WithdrawalGate<K> {
    fn authorize(
        &self,
        user_id: &UserId,
        supplied_code: &str,
        amount: Amount,
    ) -> GateResult<Authorization> {
        require_positive(amount)?;

        let gate = self.store.gate_state(user_id)?;
        if let Some(reason) = check_code(&gate, supplied_code) {
            debug!(user_id = %user_id, reason = ?reason, "withdrawal denied");
            return Ok(Authorization::Denied(reason));
        }

        let balance = self.ledger.balance(user_id).map_err(ledger_error)?;
        if amount > balance {
            debug!(
                user_id = %user_id,
                amount = %amount,
                balance = %balance,
                "withdrawal denied: insufficient balance"
            );
            return Ok(Authorization::Denied(DenialReason::InsufficientBalance));
        }
        Ok(Authorization::Authorized)
    }

    fn withdraw(
        &self,
        user_id: &UserId,
        supplied_code: &str,
        amount: Amount,
        reference: &str,
    ) -> GateResult<WithdrawalOutcome> {
        require_positive(amount)?;
        if reference.trim().is_empty() {
            return Err(GateError::InvalidInput(
                "withdrawal reference is empty".into(),
            ));
        }

        let entry = LedgerEntryRef::new(Self::ledger_reference(user_id, reference), LEDGER_REASON);
        let outcome = self.store.with_gate_locked(user_id, |gate| {
            if let Some(reason) = check_code(gate, supplied_code) {
                return Ok(WithdrawalOutcome::Denied(reason));
            }
            // The debit itself refuses an overdraft, so the balance check and
            // the debit cannot be separated.
            match self.ledger.debit(user_id, amount, &entry) {
                Ok(CreditOutcome::Applied) => Ok(WithdrawalOutcome::Debited {
                    amount,
                    replayed: false,
                }),
                Ok(CreditOutcome::AlreadyApplied) => Ok(WithdrawalOutcome::Debited {
                    amount,
                    replayed: true,
                }),
                Err(LedgerError::InsufficientFunds { .. }) => Ok(WithdrawalOutcome::Denied(
                    DenialReason::InsufficientBalance,
                )),
                Err(LedgerError::ReferenceConflict { reference }) => {
                    Err(GateError::InvalidInput(format!(
                        "withdrawal reference {} was already used for a different amount",
                        reference
                    )))
                }
                Err(e) => Err(ledger_error(e)),
            }
        });

        match &outcome {
            Ok(WithdrawalOutcome::Debited { replayed, .. }) => info!(
                user_id = %user_id,
                amount = %amount,
                reference = %reference,
                replayed = *replayed,
                "withdrawal debited"
            ),
            Ok(WithdrawalOutcome::Denied(reason)) => {
                debug!(user_id = %user_id, reason = ?reason, "withdrawal denied")
            }
            Err(e) => warn!(user_id = %user_id, error = %e, "withdrawal failed"),
        }
        outcome
    }
}
