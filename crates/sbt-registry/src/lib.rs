//! SBT Registry: issuance and verification of non-transferable credentials.
//!
//! An issuer publishes typed requirement sets per credential class,
//! evaluates claims against them, certifies principals on the strength of
//! an external attestation, and revokes certifications. Every state change
//! lands in a hash-chained audit log.

pub mod access;
pub mod audit;
pub mod certification;
pub mod config;
pub mod error;
pub mod identity;
pub mod query;
pub mod registry;
pub mod requirement;
pub mod storage;
pub mod time;

// Re-export primary types
pub use error::{RegistryError, Result};
pub use identity::{ClassId, PrincipalId};
pub use registry::Registry;

// Re-export requirement types
pub use requirement::{
    evaluate_detailed, evaluate_requirements, Claims, ClauseOutcome, Evaluation, Metadata,
    Operator, Relation, RequirementClause, RequirementSet, Value, ValueKind,
};

// Re-export certification types
pub use certification::{CertificationRecord, CertificationState, RevocationReason};

// Re-export audit types
pub use audit::{
    verify_audit_chain, AuditEntry, AuditEvent, AuditEventKind, AuditId, AuditSink,
    FileAuditLog, MemoryAuditLog,
};

pub use access::IssuerGuard;
pub use config::RegistryConfig;
pub use query::{query_audit, AuditQuery};
pub use storage::{FileStore, KeyValueStore, LockFile, MemoryStore};
