//! Advisory lock around a run.
//!
//! Two overlapping runs against the same state file could both pick the
//! same item. The lock file is created exclusively before state is loaded
//! and removed when the guard drops. A stale lock left by a killed process
//! must be removed by hand; its contents name the owning pid.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::domain::StoreError;

/// Held lock; released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock at `path`.
    ///
    /// # Errors
    /// `StoreError::Locked` if another run holds it, `StoreError::Io` otherwise.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::Locked {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        let owner = format!("pid={} at={}\n", std::process::id(), Utc::now().to_rfc3339());
        if let Err(e) = file.write_all(owner.as_bytes()) {
            let _ = fs::remove_file(path);
            return Err(StoreError::io(path, e));
        }

        tracing::debug!(path = %path.display(), "Lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Lock released"),
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove lock file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json.lock");

        let held = RunLock::acquire(&path).unwrap();
        let err = RunLock::acquire(&path).unwrap_err();
        assert!(matches!(err, StoreError::Locked { .. }));

        drop(held);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_lock_records_owner() {
        let dir = tempdir().unwrap();
        let lock = RunLock::acquire(&dir.path().join("run.lock")).unwrap();
        let content = fs::read_to_string(lock.path()).unwrap();
        assert!(content.starts_with(&format!("pid={}", std::process::id())));
    }
}
