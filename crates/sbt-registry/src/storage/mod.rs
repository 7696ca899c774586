//! Storage layer: the key-value persistence interface and its backends.
//!
//! The registry only needs atomic per-key get / put / delete plus prefix
//! listing; it serializes all writers itself. Two backends are provided:
//!
//! - [`memory`]: `MemoryStore`, an ordered in-process map.
//! - [`file`]: `FileStore`, one JSON file per key under a directory.
//!
//! [`lock`] provides the lock file that keeps a second process from
//! writing to the same directory.
//!
//! # Key layout
//!
//! ```text
//! issuer                                  current issuer identity
//! requirements/{class}                    RequirementSet
//! certifications/{class}/{principal}      CertificationRecord
//! ```
//!
//! Every value is a JSON document of the form
//! `{ "version": 1, "value": { ... } }`.

pub mod file;
pub mod lock;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::identity::{ClassId, PrincipalId};

pub use file::FileStore;
pub use lock::LockFile;
pub use memory::MemoryStore;

// ── File format constants ─────────────────────────────────────────────────────

const RECORD_VERSION: u32 = 1;

pub const ISSUER_KEY: &str = "issuer";
const REQUIREMENTS_PREFIX: &str = "requirements/";
const CERTIFICATIONS_PREFIX: &str = "certifications/";

// ── KeyValueStore ─────────────────────────────────────────────────────────────

/// Byte-oriented key-value store.
///
/// Each individual call must be atomic: a concurrent or later reader sees
/// either the old value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Returns whether it existed.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

// ── Keys ──────────────────────────────────────────────────────────────────────

/// Prefix shared by every requirement-set key.
pub fn requirements_prefix() -> &'static str {
    REQUIREMENTS_PREFIX
}

pub fn requirements_key(class: ClassId) -> String {
    format!("{REQUIREMENTS_PREFIX}{class}")
}

pub fn certification_prefix(class: ClassId) -> String {
    format!("{CERTIFICATIONS_PREFIX}{class}/")
}

pub fn certification_key(class: ClassId, principal: &PrincipalId) -> String {
    format!("{}{}", certification_prefix(class), principal)
}

// ── Versioned JSON values ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct StoredRef<'a, T> {
    version: u32,
    value: &'a T,
}

#[derive(Deserialize)]
struct Stored<T> {
    version: u32,
    value: T,
}

/// Serialize a value into its versioned JSON form.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(&StoredRef {
        version: RECORD_VERSION,
        value,
    })
    .map_err(|e| RegistryError::SerializationError(e.to_string()))
}

/// Parse a versioned JSON value read from `key`.
///
/// # Errors
///
/// Returns `RegistryError::InvalidFileFormat` for malformed documents or an
/// unsupported version.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    let stored: Stored<T> = serde_json::from_slice(bytes).map_err(|e| {
        RegistryError::InvalidFileFormat(format!("failed to parse value for {key}: {e}"))
    })?;

    if stored.version != RECORD_VERSION {
        return Err(RegistryError::InvalidFileFormat(format!(
            "unsupported record version {} for {key}",
            stored.version
        )));
    }

    Ok(stored.value)
}

/// Read and decode the value under `key`, if any.
pub fn load<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .get(key)?
        .map(|bytes| decode(key, &bytes))
        .transpose()
}
