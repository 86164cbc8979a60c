//! # AC-01 Purchase Store
//!
//! Canonical state of the access-code lifecycle.
//!
//! ## Owned rows
//!
//! - `PurchaseRecord`: append-only audit trail of one purchase attempt
//! - `UserGateState`: the user's current code, derived from approvals
//! - `ReferralLink`: referral bonus bookkeeping (`Pending -> Confirmed` once)
//! - `AccessCodeSetting`: versioned global code
//! - `PendingCredit`: referral credits not yet acknowledged by the ledger
//!
//! ## Invariants enforced here
//!
//! | Invariant | Where |
//! |-----------|-------|
//! | at most one `Pending` record per user | `submit`, `import_legacy` (open pointer under write lock) |
//! | record and gate written together | `commit_transition` (single batch) |
//! | no lost update on a record | `commit_transition` version precondition |
//! | referral confirmed at most once | `confirm_referral` compare-and-swap |

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileBackedKVStore, InMemoryKVStore};
pub use domain::{KVStoreError, LegacyPurchaseRow, PendingCredit, PendingCreditKind};
pub use ports::{BatchOperation, KeyValueStore, PurchaseStoreApi};
pub use service::{
    CommittedTransition, ConfirmOutcome, GateChange, PurchaseStore, TransitionCommit,
};
