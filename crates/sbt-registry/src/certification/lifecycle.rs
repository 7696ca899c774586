//! Certification state machine.
//!
//! ```text
//! absent --issue--> active --revoke--> revoked --issue--> active
//! absent --revoke--> (rejected, no transition)
//! ```
//!
//! The transitions are pure: they take the current record (if any) and
//! return the next one. Persisting it is the registry's job.

use crate::error::{RegistryError, Result};
use crate::identity::{ClassId, PrincipalId};

use super::record::{CertificationRecord, CertificationState, RevocationReason};

/// Issue (or re-issue) a certification.
///
/// The attestation has already been checked by the caller; issuing itself
/// cannot fail.
pub fn issue(
    current: Option<CertificationRecord>,
    principal: &PrincipalId,
    class: ClassId,
    now: u64,
) -> CertificationRecord {
    match current {
        Some(mut record) => {
            record.state = CertificationState::Active;
            record.issued_at = now;
            record.revoked_at = None;
            record.revocation_reason = None;
            record.issue_count = record.issue_count.saturating_add(1);
            record
        }
        None => CertificationRecord {
            principal: principal.clone(),
            class,
            state: CertificationState::Active,
            issued_at: now,
            revoked_at: None,
            revocation_reason: None,
            issue_count: 1,
        },
    }
}

/// Revoke a certification.
///
/// Revoking an already revoked record succeeds and refreshes the revocation
/// timestamp and reason.
///
/// # Errors
///
/// Returns `RegistryError::NothingToRevoke` if no record exists.
pub fn revoke(
    current: Option<CertificationRecord>,
    principal: &PrincipalId,
    class: ClassId,
    reason: RevocationReason,
    now: u64,
) -> Result<CertificationRecord> {
    let mut record = current.ok_or_else(|| RegistryError::NothingToRevoke {
        principal: principal.to_string(),
        class: class.0,
    })?;

    record.state = CertificationState::Revoked;
    record.revoked_at = Some(now);
    record.revocation_reason = Some(reason);
    Ok(record)
}

/// State of an optional record; a missing record is `Absent`.
pub fn state_of(record: Option<&CertificationRecord>) -> CertificationState {
    record
        .map(|r| r.state)
        .unwrap_or(CertificationState::Absent)
}
