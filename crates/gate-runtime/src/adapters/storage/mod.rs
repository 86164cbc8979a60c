//! # Storage Backends
//!
//! `AnyKVStore` lets the container pick the backend at startup while the
//! services stay generic over one concrete `KeyValueStore`.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

use ac_01_purchase_store::{
    BatchOperation, FileBackedKVStore, InMemoryKVStore, KVStoreError, KeyValueStore,
};

pub enum AnyKVStore {
    Memory(InMemoryKVStore),
    File(FileBackedKVStore),
    #[cfg(feature = "rocksdb")]
    RocksDb(RocksDbStore),
}

impl AnyKVStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyKVStore::Memory(_) => "memory",
            AnyKVStore::File(_) => "file",
            #[cfg(feature = "rocksdb")]
            AnyKVStore::RocksDb(_) => "rocksdb",
        }
    }
}

macro_rules! delegate {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            AnyKVStore::Memory($store) => $call,
            AnyKVStore::File($store) => $call,
            #[cfg(feature = "rocksdb")]
            AnyKVStore::RocksDb($store) => $call,
        }
    };
}

impl KeyValueStore for AnyKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        delegate!(self, s => s.get(key))
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        delegate!(self, s => s.put(key, value))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        delegate!(self, s => s.delete(key))
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        delegate!(self, s => s.atomic_batch_write(operations))
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        delegate!(self, s => s.exists(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        delegate!(self, s => s.prefix_scan(prefix))
    }
}
