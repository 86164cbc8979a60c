//! # Balance Ledger Port
//!
//! Driven port for the external balance ledger. The lifecycle only issues
//! the credit/debit events it triggers (referral bonus, withdrawal debit);
//! the ledger owns its own consistency model.
//!
//! Production wires an adapter to the real ledger service.
//! Testing: `InMemoryLedger` (below).

use crate::entities::{Amount, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

/// Ledger failure modes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient funds for {user_id}: balance {available}, requested {requested}")]
    InsufficientFunds {
        user_id: UserId,
        available: Amount,
        requested: Amount,
    },

    #[error("Balance overflow for {0}")]
    Overflow(UserId),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// The reference was already applied to another user, amount or direction.
    #[error("Reference {reference} already used for a different entry")]
    ReferenceConflict { reference: String },
}

/// Reason and idempotency reference attached to every ledger entry.
///
/// Entries with a reference already seen by the ledger are not applied again.
/// Reusing a reference for a different user, amount or direction is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntryRef {
    pub reference: String,
    pub reason: String,
}

impl LedgerEntryRef {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a ledger write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Applied,
    /// The reference had already been applied; nothing changed.
    AlreadyApplied,
}

/// Balance ledger interface.
pub trait BalanceLedger: Send + Sync {
    /// Current balance of `user_id` (zero for unknown users).
    fn balance(&self, user_id: &UserId) -> Result<Amount, LedgerError>;

    /// Credits `amount` to `user_id`.
    fn credit(
        &self,
        user_id: &UserId,
        amount: Amount,
        entry: &LedgerEntryRef,
    ) -> Result<CreditOutcome, LedgerError>;

    /// Debits `amount` from `user_id`; fails without side effects when the
    /// balance is insufficient.
    fn debit(
        &self,
        user_id: &UserId,
        amount: Amount,
        entry: &LedgerEntryRef,
    ) -> Result<CreditOutcome, LedgerError>;
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<UserId, Amount>,
    /// Reference -> (user, signed amount) of the entry it applied.
    applied: HashMap<String, (UserId, i128)>,
    entries: Vec<(UserId, i128, LedgerEntryRef)>,
    unavailable: bool,
}

impl LedgerState {
    /// `Some(AlreadyApplied)` for an exact replay, `None` for a fresh reference.
    fn replay(
        &self,
        user_id: &UserId,
        signed: i128,
        entry: &LedgerEntryRef,
    ) -> Result<Option<CreditOutcome>, LedgerError> {
        match self.applied.get(&entry.reference) {
            None => Ok(None),
            Some((user, amount)) if user == user_id && *amount == signed => {
                Ok(Some(CreditOutcome::AlreadyApplied))
            }
            Some(_) => Err(LedgerError::ReferenceConflict {
                reference: entry.reference.clone(),
            }),
        }
    }

    fn record(&mut self, user_id: &UserId, balance: Amount, signed: i128, entry: &LedgerEntryRef) {
        self.balances.insert(user_id.clone(), balance);
        self.applied
            .insert(entry.reference.clone(), (user_id.clone(), signed));
        self.entries.push((user_id.clone(), signed, entry.clone()));
    }
}

/// In-memory ledger for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a balance without recording an entry.
    pub fn with_balance(self, user_id: UserId, amount: Amount) -> Self {
        self.state.lock().balances.insert(user_id, amount);
        self
    }

    /// Simulates an outage: every subsequent call fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Number of entries applied for `user_id`.
    pub fn entry_count(&self, user_id: &UserId) -> usize {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|(u, _, _)| u == user_id)
            .count()
    }
}

impl BalanceLedger for InMemoryLedger {
    fn balance(&self, user_id: &UserId) -> Result<Amount, LedgerError> {
        let state = self.state.lock();
        if state.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        Ok(state.balances.get(user_id).copied().unwrap_or_default())
    }

    fn credit(
        &self,
        user_id: &UserId,
        amount: Amount,
        entry: &LedgerEntryRef,
    ) -> Result<CreditOutcome, LedgerError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        let signed = i128::from(amount.0);
        if let Some(outcome) = state.replay(user_id, signed, entry)? {
            return Ok(outcome);
        }
        let current = state.balances.get(user_id).copied().unwrap_or_default();
        let next = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(user_id.clone()))?;
        state.record(user_id, next, signed, entry);
        Ok(CreditOutcome::Applied)
    }

    fn debit(
        &self,
        user_id: &UserId,
        amount: Amount,
        entry: &LedgerEntryRef,
    ) -> Result<CreditOutcome, LedgerError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(LedgerError::Unavailable("ledger offline".into()));
        }
        let signed = -i128::from(amount.0);
        if let Some(outcome) = state.replay(user_id, signed, entry)? {
            return Ok(outcome);
        }
        let current = state.balances.get(user_id).copied().unwrap_or_default();
        let next = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientFunds {
                user_id: user_id.clone(),
                available: current,
                requested: amount,
            })?;
        state.record(user_id, next, signed, entry);
        Ok(CreditOutcome::Applied)
    }
}
