//! # File State Store
//!
//! One file per key inside a data directory.
//!
//! ## Atomic Writes
//!
//! `put` writes `.<key>.tmp`, fsyncs it, renames it over `<key>` and fsyncs
//! the directory. A crash leaves either the old file or the new one.
//!
//! ## Process Locking
//!
//! The directory is locked with `fs2` (flock on Unix, LockFile on Windows)
//! for the lifetime of the store. A second store on the same directory fails
//! with [`StoreError::Locked`].

use crate::ports::outbound::{StateStore, StoreError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct FileStateStore {
    dir: PathBuf,
    /// Held open to keep the lock.
    lock_file: File,
}

impl FileStateStore {
    /// Lock file name inside the data directory.
    const LOCK_FILE: &'static str = "state.lock";

    /// Open (creating if needed) `dir` and take its lock.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock_path = dir.join(Self::LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked { path: lock_path });
        }

        debug!(dir = %dir.display(), "State store opened");
        Ok(Self { dir, lock_file })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key != Self::LOCK_FILE
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> io::Result<()> {
        File::open(&self.dir)?.sync_all()
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> io::Result<()> {
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let tmp = self.dir.join(format!(".{}.tmp", key));

        {
            let mut file = File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        self.sync_dir()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FileStateStore {
    fn drop(&mut self) {
        if let Err(e) = self.lock_file.unlock() {
            warn!(dir = %self.dir.display(), error = %e, "Failed to release state lock");
        }
    }
}

impl std::fmt::Debug for FileStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStateStore")
            .field("dir", &self.dir)
            .finish()
    }
}
