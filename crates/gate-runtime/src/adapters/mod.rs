//! # Adapters
//!
//! Port implementations the runtime plugs into the subsystems.

pub mod referral;
pub mod storage;

pub use referral::ReferralCreditAdapter;
pub use storage::AnyKVStore;
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStore};
