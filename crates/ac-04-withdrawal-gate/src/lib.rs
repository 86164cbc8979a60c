//! # AC-04 Withdrawal Gate
//!
//! Consulted on every withdrawal attempt. Denials are values, not errors.
//!
//! | Check (in order) | Denial |
//! |------------------|--------|
//! | gate holds a code | `NoCodeIssued` |
//! | supplied code equals it, byte for byte | `CodeMismatch` |
//! | amount <= ledger balance | `InsufficientBalance` |
//!
//! `authorize` only answers; `withdraw` re-runs the checks and debits while
//! the store's write lock is held, so a revoke cannot slip in between.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{Authorization, DenialReason, WithdrawalOutcome};
pub use ports::{BalanceLedger, WithdrawalGateApi};
pub use service::WithdrawalGate;
