//! Directory-backed key-value store.
//!
//! Each key is stored as a single file named `{hex(key)}.json` inside the
//! configured base directory. Hex-encoding the key keeps arbitrary principal
//! identifiers (slashes, colons, unicode) safe as file names.
//!
//! Writes go to a temporary file that is then renamed over the target, so a
//! reader never observes a half-written value.

use std::path::{Path, PathBuf};

use crate::error::Result;

use super::KeyValueStore;

const FILE_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";

/// Filesystem-backed store.
///
/// The store is safe for single-process use; concurrent writes from
/// multiple processes are not coordinated.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new `FileStore` rooted at `base_dir`.
    ///
    /// The directory and any missing parents are created if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Io` if the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Base directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{FILE_EXTENSION}", hex::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key);
        let tmp = path.with_extension(TMP_EXTENSION);
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        match std::fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = match hex::decode(stem).map(String::from_utf8) {
                Ok(Ok(key)) => key,
                _ => {
                    log::warn!("ignoring unexpected file in store: {}", path.display());
                    continue;
                }
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}
