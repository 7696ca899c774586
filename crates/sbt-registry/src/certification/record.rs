//! Certification records and revocation reasons.

use serde::{Deserialize, Serialize};

use crate::identity::{ClassId, PrincipalId};

/// State of a (principal, class) certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationState {
    /// Never certified.
    Absent,
    /// Currently certified.
    Active,
    /// Certified at some point, then revoked.
    Revoked,
}

impl CertificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Active => "active",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for CertificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored certification of one principal for one class.
///
/// Records are created by the first issue and never deleted; revocation is a
/// state, not a removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationRecord {
    pub principal: PrincipalId,
    pub class: ClassId,
    /// `Active` or `Revoked`; a stored record is never `Absent`.
    pub state: CertificationState,
    /// Latest issue timestamp (microseconds since epoch).
    pub issued_at: u64,
    /// Latest revocation timestamp, cleared on re-issue.
    pub revoked_at: Option<u64>,
    /// Reason given for the latest revocation, cleared on re-issue.
    pub revocation_reason: Option<RevocationReason>,
    /// Number of successful issues, including re-issues.
    pub issue_count: u32,
}

impl CertificationRecord {
    pub fn is_active(&self) -> bool {
        self.state == CertificationState::Active
    }
}

/// Reason for revocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RevocationReason {
    /// Certification has expired naturally.
    Expired,
    /// Principal's key or system has been compromised.
    Compromised,
    /// Principal no longer satisfies the class requirements.
    RequirementsNoLongerMet,
    /// Manual revocation by the issuer.
    ManualRevocation,
    /// Principal requested revocation.
    PrincipalRequest,
    /// Custom reason.
    Custom(String),
}

impl RevocationReason {
    /// Return a stable string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Expired => "expired",
            Self::Compromised => "compromised",
            Self::RequirementsNoLongerMet => "requirements_no_longer_met",
            Self::ManualRevocation => "manual_revocation",
            Self::PrincipalRequest => "principal_request",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Parse a stable string; anything unrecognized becomes `Custom`.
    pub fn parse(s: &str) -> Self {
        match s {
            "expired" => Self::Expired,
            "compromised" => Self::Compromised,
            "requirements_no_longer_met" => Self::RequirementsNoLongerMet,
            "manual_revocation" | "manual" => Self::ManualRevocation,
            "principal_request" => Self::PrincipalRequest,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
