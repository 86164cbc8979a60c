//! # Shared Types Crate
//!
//! This crate contains the entities, the purchase state machine and the
//! driven ports shared by every access-gate subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `PurchaseStatus`, `DispositionAction` and the
//!   transition table live here and nowhere else.
//! - **Invariants in the type**: `PurchaseRecord` and `UserGateState` keep
//!   their fields private; every mutation goes through a transition method
//!   that preserves `issued_code <=> Approved` and
//!   `has_purchased <=> access_code.is_some()`.
//! - **Identity from the caller**: user and operator identifiers are asserted
//!   by the identity provider and never derived from payloads.

pub mod entities;
pub mod errors;
pub mod gate;
pub mod ledger;
pub mod lifecycle;
pub mod purchase;
pub mod referral;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use gate::UserGateState;
pub use ledger::{BalanceLedger, CreditOutcome, InMemoryLedger, LedgerEntryRef, LedgerError};
pub use lifecycle::{next_status, DispositionAction, PurchaseStatus, TRANSITIONS};
pub use purchase::{IssuedCode, PurchaseRecord};
pub use referral::{AccessCodeSetting, CreditSource, CreditStatus, ReferralLink};
pub use time::{MockTimeSource, SystemTimeSource, TimeSource, Timestamp};
