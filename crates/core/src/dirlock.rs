// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exclusive advisory lock on the data directory
//!
//! Only one broker process may own a data directory. The lock is a
//! non-blocking `flock` on the directory's own descriptor: contention fails
//! immediately and is never retried.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

/// Errors from acquiring or releasing the directory lock
#[derive(Debug, Error)]
pub enum DirLockError {
    #[error("cannot open directory {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot flock directory {} - already held", path.display())]
    Held { path: PathBuf },

    #[error("cannot flock directory {}: {source}", path.display())]
    Flock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("directory lock on {} is not held", path.display())]
    NotHeld { path: PathBuf },

    #[error("cannot unlock directory {}: {source}", path.display())]
    Unlock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A held lock on a directory.
///
/// The lock lives as long as the open descriptor: `release` unlocks and
/// closes it, and dropping the handle closes it too.
#[derive(Debug)]
pub struct LockHandle {
    path: PathBuf,
    file: File,
}

impl LockHandle {
    /// Open `path` and take an exclusive, non-blocking lock on it
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, DirLockError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| DirLockError::Open {
            path: path.clone(),
            source,
        })?;

        if let Err(source) = file.try_lock_exclusive() {
            if is_contended(&source) {
                return Err(DirLockError::Held { path });
            }
            return Err(DirLockError::Flock { path, source });
        }

        debug!(path = %path.display(), "acquired directory lock");
        Ok(Self { path, file })
    }

    /// Unlock and close the directory descriptor
    pub fn release(self) -> Result<(), DirLockError> {
        let result = FileExt::unlock(&self.file).map_err(|source| DirLockError::Unlock {
            path: self.path.clone(),
            source,
        });
        debug!(path = %self.path.display(), "released directory lock");
        // self.file closes here
        result
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Owner of the data directory lock for the lifetime of a node
#[derive(Debug)]
pub struct DirLock {
    dir: PathBuf,
    handle: Option<LockHandle>,
}

impl DirLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            handle: None,
        }
    }

    /// Acquire the lock. Fails with `Held` if it is already held, including
    /// by this same `DirLock`.
    pub fn lock(&mut self) -> Result<(), DirLockError> {
        if self.handle.is_some() {
            return Err(DirLockError::Held {
                path: self.dir.clone(),
            });
        }
        self.handle = Some(LockHandle::acquire(&self.dir)?);
        Ok(())
    }

    /// Release the lock. A second call reports `NotHeld`.
    pub fn unlock(&mut self) -> Result<(), DirLockError> {
        match self.handle.take() {
            Some(handle) => handle.release(),
            None => Err(DirLockError::NotHeld {
                path: self.dir.clone(),
            }),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.handle.is_some()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
#[path = "dirlock_tests.rs"]
mod tests;
