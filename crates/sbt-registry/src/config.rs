//! Registry configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Default cap on clauses per requirement set.
pub const DEFAULT_MAX_CLAUSES: usize = 64;

/// Tunable limits and validation switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Largest requirement set accepted by `set_requirements`.
    pub max_clauses: usize,
    /// Reject clauses whose metadata type tag does not name the variant of
    /// the expected value. When false, the mismatch is only logged.
    pub strict_type_tags: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_clauses: DEFAULT_MAX_CLAUSES,
            strict_type_tags: false,
        }
    }
}

impl RegistryConfig {
    /// Load a JSON config file, falling back to defaults when it is absent.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidFileFormat` if the file is not valid
    /// JSON, or `RegistryError::Io` for other filesystem errors.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::InvalidFileFormat(format!(
                "failed to parse config {}: {e}",
                path.display()
            ))
        })
    }
}
