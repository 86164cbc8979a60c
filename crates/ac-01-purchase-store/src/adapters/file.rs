//! # File-Backed Key-Value Store
//!
//! Whole-map snapshot persisted on every write.
//!
//! Format: `[key_len: u32 LE][key][value_len: u32 LE][value]...`, written to
//! a temporary file, synced, then renamed over the previous snapshot. A batch
//! is applied to a copy of the map and only becomes visible once the
//! snapshot containing it is on disk.

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

pub struct FileBackedKVStore {
    data: Map,
    path: PathBuf,
    #[cfg(feature = "locking")]
    _lock: super::lock::StoreLock,
}

impl FileBackedKVStore {
    /// Opens (or creates) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(KVStoreError::io)?;
        }

        #[cfg(feature = "locking")]
        let lock = super::lock::StoreLock::acquire(&path.with_extension("lock"))?;

        let data = match std::fs::read(&path) {
            Ok(bytes) => Self::decode_snapshot(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(KVStoreError::io(e)),
        };
        info!(path = %path.display(), keys = data.len(), "Opened file-backed store");

        Ok(Self {
            data,
            path,
            #[cfg(feature = "locking")]
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_snapshot(bytes: &[u8]) -> Result<Map, KVStoreError> {
        fn take<'a>(bytes: &'a [u8], cursor: &mut usize) -> Result<&'a [u8], KVStoreError> {
            let start = *cursor;
            let corrupt = || KVStoreError::CorruptionError {
                message: format!("truncated snapshot at byte {}", start),
            };
            let len_end = cursor.checked_add(4).ok_or_else(corrupt)?;
            let len_bytes: [u8; 4] = bytes
                .get(*cursor..len_end)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(corrupt)?;
            let len = u32::from_le_bytes(len_bytes) as usize;
            let end = len_end.checked_add(len).ok_or_else(corrupt)?;
            let slice = bytes.get(len_end..end).ok_or_else(corrupt)?;
            *cursor = end;
            Ok(slice)
        }

        let mut data = Map::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let key = take(bytes, &mut cursor)?.to_vec();
            let value = take(bytes, &mut cursor)?.to_vec();
            data.insert(key, value);
        }
        Ok(data)
    }

    fn encode_snapshot(data: &Map) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (key, value) in data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }
        bytes
    }

    fn persist(&self, data: &Map) -> Result<(), KVStoreError> {
        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(KVStoreError::io)?;
        file.write_all(&Self::encode_snapshot(data))
            .map_err(KVStoreError::io)?;
        file.sync_all().map_err(KVStoreError::io)?;
        std::fs::rename(&temp_path, &self.path).map_err(KVStoreError::io)
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.atomic_batch_write(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.atomic_batch_write(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut next = self.data.clone();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        self.persist(&next)?;
        self.data = next;
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, KVStoreError> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
