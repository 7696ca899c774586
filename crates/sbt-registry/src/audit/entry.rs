//! Audit events and hash-chained audit entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::certification::RevocationReason;
use crate::error::{RegistryError, Result};
use crate::identity::{ClassId, PrincipalId};
use crate::requirement::RequirementSet;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// An externally observable state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    RequirementsChanged {
        class: ClassId,
        requirements: RequirementSet,
    },
    Certified {
        principal: PrincipalId,
        class: ClassId,
    },
    Revoked {
        principal: PrincipalId,
        class: ClassId,
        reason: RevocationReason,
    },
    IssuerTransferred {
        previous: PrincipalId,
        new_issuer: PrincipalId,
    },
}

/// Discriminant of an [`AuditEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditEventKind {
    RequirementsChanged,
    Certified,
    Revoked,
    IssuerTransferred,
}

impl AuditEventKind {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::RequirementsChanged => "requirements_changed",
            Self::Certified => "certified",
            Self::Revoked => "revoked",
            Self::IssuerTransferred => "issuer_transferred",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "requirements_changed" => Some(Self::RequirementsChanged),
            "certified" => Some(Self::Certified),
            "revoked" => Some(Self::Revoked),
            "issuer_transferred" => Some(Self::IssuerTransferred),
            _ => None,
        }
    }
}

impl AuditEvent {
    pub fn kind(&self) -> AuditEventKind {
        match self {
            Self::RequirementsChanged { .. } => AuditEventKind::RequirementsChanged,
            Self::Certified { .. } => AuditEventKind::Certified,
            Self::Revoked { .. } => AuditEventKind::Revoked,
            Self::IssuerTransferred { .. } => AuditEventKind::IssuerTransferred,
        }
    }

    /// Credential class the event concerns, if any.
    pub fn class(&self) -> Option<ClassId> {
        match self {
            Self::RequirementsChanged { class, .. }
            | Self::Certified { class, .. }
            | Self::Revoked { class, .. } => Some(*class),
            Self::IssuerTransferred { .. } => None,
        }
    }

    /// Principal the event concerns, if any.
    ///
    /// For an issuer transfer this is the new issuer.
    pub fn principal(&self) -> Option<&PrincipalId> {
        match self {
            Self::Certified { principal, .. } | Self::Revoked { principal, .. } => Some(principal),
            Self::IssuerTransferred { new_issuer, .. } => Some(new_issuer),
            Self::RequirementsChanged { .. } => None,
        }
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        match self {
            Self::RequirementsChanged {
                class,
                requirements,
            } => format!(
                "requirements for class {class} set to {} clause(s) joined by {}",
                requirements.len(),
                requirements.relation
            ),
            Self::Certified { principal, class } => {
                format!("{principal} certified for class {class}")
            }
            Self::Revoked {
                principal,
                class,
                reason,
            } => format!("{principal} revoked for class {class} ({reason})"),
            Self::IssuerTransferred {
                previous,
                new_issuer,
            } => format!("issuer transferred from {previous} to {new_issuer}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Unique identifier for an audit entry.
///
/// Format: `aevt_` + base58 of the first 16 bytes of the entry hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub String);

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One link of the append-only audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    /// Append timestamp (microseconds since epoch).
    pub timestamp: u64,
    pub event: AuditEvent,
    /// Hash of the preceding entry (None for the first entry).
    pub previous_hash: Option<String>,
    /// SHA-256 (hex) over previous hash, sequence, timestamp and event.
    pub hash: String,
}

impl AuditEntry {
    /// Build the entry following `previous` (or the genesis entry).
    pub fn seal(previous: Option<&AuditEntry>, event: AuditEvent, timestamp: u64) -> Result<Self> {
        let sequence = previous.map(|p| p.sequence + 1).unwrap_or(0);
        let previous_hash = previous.map(|p| p.hash.clone());
        let hash = compute_hash(previous_hash.as_deref(), sequence, timestamp, &event)?;

        let digest = hex::decode(&hash)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        let id = AuditId(format!("aevt_{}", bs58::encode(&digest[..16]).into_string()));

        Ok(Self {
            id,
            sequence,
            timestamp,
            event,
            previous_hash,
            hash,
        })
    }

    /// Recompute this entry's hash from its contents.
    pub fn recompute_hash(&self) -> Result<String> {
        compute_hash(
            self.previous_hash.as_deref(),
            self.sequence,
            self.timestamp,
            &self.event,
        )
    }
}

fn compute_hash(
    previous_hash: Option<&str>,
    sequence: u64,
    timestamp: u64,
    event: &AuditEvent,
) -> Result<String> {
    let event_bytes =
        serde_json::to_vec(event).map_err(|e| RegistryError::SerializationError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(previous_hash.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(sequence.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(&event_bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Verify a chain of audit entries (ordered from oldest to newest).
///
/// Checks that every hash matches the entry contents, that sequence numbers
/// are consecutive and that each entry links to its predecessor. A chain may
/// start mid-log; only internal consistency is checked for its first entry.
///
/// # Errors
///
/// Returns `RegistryError::AuditChainBroken` naming the first bad sequence.
pub fn verify_audit_chain(chain: &[AuditEntry]) -> Result<bool> {
    for (i, entry) in chain.iter().enumerate() {
        if entry.recompute_hash()? != entry.hash {
            return Err(RegistryError::AuditChainBroken {
                sequence: entry.sequence,
            });
        }

        if i > 0 {
            let prev = &chain[i - 1];
            let linked = entry.previous_hash.as_deref() == Some(prev.hash.as_str());
            if !linked || entry.sequence != prev.sequence + 1 {
                return Err(RegistryError::AuditChainBroken {
                    sequence: entry.sequence,
                });
            }
        }
    }

    Ok(true)
}
