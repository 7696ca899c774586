//! Error types for the SBT registry.
//!
//! All errors are strongly typed and propagated without panicking.
//! A failed operation leaves every stored record exactly as it was.

/// Registry error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unauthorized: {caller} is not the current issuer")]
    Unauthorized { caller: String },

    #[error("Invalid requirement at clause {index}: {reason}")]
    InvalidRequirement { index: usize, reason: String },

    #[error("Attestation rejected for {principal} in class {class}")]
    AttestationRejected { principal: String, class: u64 },

    #[error("Nothing to revoke: {principal} was never certified for class {class}")]
    NothingToRevoke { principal: String, class: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid comparison: {0}")]
    InvalidComparison(String),

    #[error("Audit chain broken at sequence {sequence}")]
    AuditChainBroken { sequence: u64 },

    #[error("Registry already initialized")]
    AlreadyInitialized,

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, RegistryError>;
