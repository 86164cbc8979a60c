//! # Store Lock
//!
//! Exclusive `fs2` lock next to the store file, held for the lifetime of the
//! store so two processes never rewrite the same file.

use crate::domain::errors::KVStoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the lock without blocking.
    pub fn acquire(path: &Path) -> Result<Self, KVStoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(KVStoreError::io)?;

        if file.try_lock_exclusive().is_err() {
            return Err(KVStoreError::Locked {
                path: path.to_path_buf(),
            });
        }

        file.set_len(0).map_err(KVStoreError::io)?;
        write!(file, "{}", std::process::id()).map_err(KVStoreError::io)?;
        file.sync_all().map_err(KVStoreError::io)?;

        tracing::debug!(path = %path.display(), "Store lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
        tracing::debug!(path = %self.path.display(), "Store lock released");
    }
}
