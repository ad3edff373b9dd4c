//! Single-instance lock
//!
//! An advisory exclusive lock on a file guarantees at most one coupler syncs
//! into the same index at a time. The lock is held for the lifetime of the
//! `InstanceLock` value and released when it is dropped. The file itself is
//! left in place; it carries the pid of the last holder for operators.

use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

const RETRY_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file {path:?} is held by another process (waited {waited:?})")]
    Timeout { path: PathBuf, waited: Duration },

    #[error("lock file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Takes the lock if it is free; `Ok(None)` when another holder has it
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Error(source)) => return Err(io_err(source)),
        }

        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    /// Takes the lock, retrying until `timeout` has passed
    pub async fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        let started = Instant::now();
        loop {
            if let Some(lock) = Self::try_acquire(path)? {
                return Ok(lock);
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LockError::Timeout {
                    path: path.to_path_buf(),
                    waited,
                });
            }
            tokio::time::sleep(RETRY_INTERVAL.min(timeout - waited)).await;
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!("Failed to unlock {:?}: {}", self.path, e);
        } else {
            debug!("Released lock file {:?}", self.path);
        }
    }
}
