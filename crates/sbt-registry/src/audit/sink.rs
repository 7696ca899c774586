//! Audit sinks: where the registry writes its events.
//!
//! - [`MemoryAuditLog`] keeps the chain in process.
//! - [`FileAuditLog`] appends one JSON entry per line to a file and reloads
//!   the chain when reopened. One handle per file at a time.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{RegistryError, Result};
use crate::storage::LockFile;

use super::entry::{verify_audit_chain, AuditEntry, AuditEvent};

/// Append-only sink for audit events.
///
/// `append` must be all-or-nothing: when it returns an error the event is
/// not part of the log.
pub trait AuditSink: Send + Sync {
    /// Seal `event` onto the end of the chain and return the new entry.
    fn append(&self, event: AuditEvent) -> Result<AuditEntry>;

    /// Every entry, oldest first.
    fn entries(&self) -> Result<Vec<AuditEntry>>;

    /// Number of entries in the log.
    fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// Verify the hash chain of the whole log.
    fn verify(&self) -> Result<bool> {
        verify_audit_chain(&self.entries()?)
    }
}

fn lock_entries(mutex: &Mutex<Vec<AuditEntry>>) -> Result<MutexGuard<'_, Vec<AuditEntry>>> {
    mutex
        .lock()
        .map_err(|e| RegistryError::StorageError(format!("audit log lock poisoned: {e}")))
}

// ── MemoryAuditLog ────────────────────────────────────────────────────────────

/// In-memory audit chain.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, event: AuditEvent) -> Result<AuditEntry> {
        let mut entries = lock_entries(&self.entries)?;
        let entry = AuditEntry::seal(entries.last(), event, crate::time::now_micros())?;
        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(lock_entries(&self.entries)?.clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(lock_entries(&self.entries)?.len())
    }
}

// ── FileAuditLog ──────────────────────────────────────────────────────────────

/// Audit chain persisted as JSON lines.
///
/// The file is read and verified once on open; afterwards the in-memory copy
/// is authoritative and every append is written through before it becomes
/// visible. An open log holds `<path>.lock` until it is dropped, so a second
/// handle on the same file fails with `RegistryError::Locked` instead of
/// forking the chain.
pub struct FileAuditLog {
    path: PathBuf,
    entries: Mutex<Vec<AuditEntry>>,
    _lock: LockFile,
}

impl FileAuditLog {
    /// Open (or create) the log at `path`.
    ///
    /// A final line without a trailing newline is the remains of an
    /// interrupted append: it is cut off if it does not parse.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Locked` if another handle has the log open,
    /// `RegistryError::InvalidFileFormat` for an unparsable complete line,
    /// `RegistryError::AuditChainBroken` if the stored chain does not verify,
    /// or `RegistryError::Io` for filesystem errors.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock = LockFile::acquire(path.with_extension("lock"))?;
        let entries = load_entries(&path)?;
        verify_audit_chain(&entries)?;
        log::debug!(
            "opened audit log {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load_entries(path: &Path) -> Result<Vec<AuditEntry>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    let mut offset = 0u64;
    for (lineno, segment) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
        let start = offset;
        offset += segment.len() as u64;
        let complete = segment.ends_with(b"\n");

        let text = String::from_utf8_lossy(segment);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<AuditEntry>(line) {
            Ok(entry) => {
                entries.push(entry);
                if !complete {
                    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
                    file.write_all(b"\n")?;
                    file.sync_data()?;
                }
            }
            Err(e) if !complete => {
                log::warn!(
                    "{}:{}: dropping incomplete trailing entry ({e})",
                    path.display(),
                    lineno + 1
                );
                let file = std::fs::OpenOptions::new().write(true).open(path)?;
                file.set_len(start)?;
                file.sync_data()?;
            }
            Err(e) => {
                return Err(RegistryError::InvalidFileFormat(format!(
                    "{}:{}: {e}",
                    path.display(),
                    lineno + 1
                )));
            }
        }
    }
    Ok(entries)
}

/// Run `write` against `file`, cutting the file back to its prior length if
/// the write fails part way.
fn append_or_truncate<F>(file: &mut std::fs::File, write: F) -> Result<()>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    let previous_len = file.metadata()?.len();
    if let Err(e) = write(&mut *file) {
        if let Err(truncate) = file.set_len(previous_len).and_then(|()| file.sync_data()) {
            log::error!("failed to roll back partial audit append: {truncate}");
        }
        return Err(e.into());
    }
    Ok(())
}

impl AuditSink for FileAuditLog {
    fn append(&self, event: AuditEvent) -> Result<AuditEntry> {
        let mut entries = lock_entries(&self.entries)?;
        let entry = AuditEntry::seal(entries.last(), event, crate::time::now_micros())?;

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        append_or_truncate(&mut file, |f| {
            f.write_all(line.as_bytes())?;
            f.sync_data()
        })?;

        entries.push(entry.clone());
        Ok(entry)
    }

    fn entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(lock_entries(&self.entries)?.clone())
    }

    fn len(&self) -> Result<usize> {
        Ok(lock_entries(&self.entries)?.len())
    }
}
