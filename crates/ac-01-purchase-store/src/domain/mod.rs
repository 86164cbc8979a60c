//! Domain layer of the purchase store.

pub mod errors;
pub mod keys;
pub mod legacy;
pub mod reconciliation;

pub use errors::KVStoreError;
pub use keys::KeyPrefix;
pub use legacy::LegacyPurchaseRow;
pub use reconciliation::{PendingCredit, PendingCreditKind};
