//! Certification lifecycle: issuing, revoking and querying certifications.
//!
//! The certification module provides:
//! - Per (principal, class) certification records
//! - The absent / active / revoked state machine
//! - Revocation reasons

pub mod lifecycle;
pub mod record;

pub use lifecycle::{issue, revoke, state_of};
pub use record::{CertificationRecord, CertificationState, RevocationReason};
