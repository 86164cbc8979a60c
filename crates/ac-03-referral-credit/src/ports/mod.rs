//! Ports (hexagonal architecture).
//!
//! The only driven port besides the purchase store is the balance ledger,
//! defined in `shared_types::ledger`.

pub mod inbound;

pub use inbound::ReferralCreditApi;
pub use shared_types::ledger::BalanceLedger;
