//! Query engine for audit entries.
//!
//! [`AuditQuery`] / [`query_audit`] filter an audit chain by event kind,
//! credential class, principal and sequence number.
//!
//! ## Query execution model
//!
//! 1. Every entry is tested against each specified filter (logical AND).
//! 2. Matching entries keep their log order (oldest first).
//! 3. An optional limit keeps the *most recent* matches.

use crate::audit::{AuditEntry, AuditEventKind};
use crate::identity::{ClassId, PrincipalId};

/// Query parameters for filtering [`AuditEntry`] records.
///
/// All fields are optional. Unset fields impose no restriction.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict results to events of this kind.
    pub kind: Option<AuditEventKind>,
    /// Restrict results to events concerning this credential class.
    pub class: Option<ClassId>,
    /// Restrict results to events concerning this principal.
    pub principal: Option<PrincipalId>,
    /// Restrict results to entries with `sequence >= since_sequence`.
    pub since_sequence: Option<u64>,
    /// Keep at most this many of the most recent matches.
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: AuditEventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn class(mut self, class: ClassId) -> Self {
        self.class = Some(class);
        self
    }

    pub fn principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn since(mut self, sequence: u64) -> Self {
        self.since_sequence = Some(sequence);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(kind) = self.kind {
            if entry.event.kind() != kind {
                return false;
            }
        }
        if let Some(class) = self.class {
            if entry.event.class() != Some(class) {
                return false;
            }
        }
        if let Some(principal) = &self.principal {
            if entry.event.principal() != Some(principal) {
                return false;
            }
        }
        if let Some(since) = self.since_sequence {
            if entry.sequence < since {
                return false;
            }
        }
        true
    }
}

/// Execute `query` against `entries`.
pub fn query_audit<'a>(entries: &'a [AuditEntry], query: &AuditQuery) -> Vec<&'a AuditEntry> {
    let mut results: Vec<&AuditEntry> = entries.iter().filter(|e| query.matches(e)).collect();

    if let Some(limit) = query.limit {
        let skip = results.len().saturating_sub(limit);
        results.drain(..skip);
    }

    results
}
