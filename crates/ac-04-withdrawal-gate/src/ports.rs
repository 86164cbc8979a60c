//! # Ports
//!
//! Inbound: `WithdrawalGateApi`. Outbound: the balance ledger
//! (`shared_types::ledger::BalanceLedger`) and the purchase store.

use crate::domain::{Authorization, WithdrawalOutcome};
use shared_types::{Amount, GateResult, UserId};

pub use shared_types::ledger::BalanceLedger;

pub trait WithdrawalGateApi: Send + Sync {
    /// Checks, in order: a code was issued, `supplied_code` matches it
    /// exactly, `amount` does not exceed the balance. Moves no money.
    fn authorize(
        &self,
        user_id: &UserId,
        supplied_code: &str,
        amount: Amount,
    ) -> GateResult<Authorization>;

    /// Re-runs the checks and debits, with no transition able to change the
    /// code in between. `reference` makes retries of one withdrawal idempotent.
    fn withdraw(
        &self,
        user_id: &UserId,
        supplied_code: &str,
        amount: Amount,
        reference: &str,
    ) -> GateResult<WithdrawalOutcome>;
}
