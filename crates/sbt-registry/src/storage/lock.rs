//! Exclusive advisory lock backed by a `create_new` lock file.
//!
//! The lock file holds the owning process id. It is removed when the
//! [`LockFile`] is dropped; a process that dies while holding the lock
//! leaves the file behind, and it must be deleted by hand.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RegistryError, Result};

/// Held exclusive lock on a path.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Take the lock at `path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Locked` if another holder owns the lock, or
    /// `RegistryError::Io` for other filesystem errors.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = std::fs::read_to_string(&path).unwrap_or_default();
                return Err(RegistryError::Locked(format!(
                    "{} is held by process {} (remove the file if that process is gone)",
                    path.display(),
                    owner.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        writeln!(file, "{}", std::process::id())?;
        log::debug!("acquired lock {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("failed to release lock {}: {e}", self.path.display());
        }
    }
}
