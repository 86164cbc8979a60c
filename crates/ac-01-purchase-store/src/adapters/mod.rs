//! Adapters for the key-value store port.

pub mod codec;
pub mod file;
#[cfg(feature = "locking")]
pub mod lock;
pub mod memory;

pub use file::FileBackedKVStore;
pub use memory::InMemoryKVStore;
