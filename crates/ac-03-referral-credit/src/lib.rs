//! # AC-03 Referral Credit Trigger
//!
//! Releases the referral bonus when a referred user's purchase is first
//! approved.
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | at most one credit per link | compare-and-swap `Pending -> Confirmed` in the store |
//! | no double credit on retry | ledger reference `referral:<new_user>` |
//! | no lost credit | outbox entry written with the confirmation, drained by `reconcile` |
//!
//! Failures never surface to the approval that triggered the credit.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{ReconcileReport, ReferralConfig, ReferralOutcome};
pub use ports::ReferralCreditApi;
pub use service::ReferralCreditTrigger;
