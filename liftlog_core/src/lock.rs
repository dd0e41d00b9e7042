//! Advisory lock on the data directory.
//!
//! Held by every mutating CLI invocation so concurrent processes take turns
//! on the exercise table and the live log.

use crate::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on a lock file, released on drop
#[derive(Debug)]
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Block until the lock at `path` is acquired
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;

        file.lock_exclusive()?;
        tracing::debug!("Acquired data lock {:?}", path);

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release data lock {:?}: {}", self.path, e);
        } else {
            tracing::debug!("Released data lock {:?}", self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("data").join("liftlog.lock");

        let held = DataDirLock::acquire(&path).unwrap();
        assert!(path.exists());

        let other = File::open(&path).unwrap();
        assert!(other.try_lock_exclusive().is_err());

        drop(held);
        assert!(other.try_lock_exclusive().is_ok());
        other.unlock().unwrap();
    }
}
