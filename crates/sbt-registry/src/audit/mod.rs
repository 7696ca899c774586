//! Audit log: append-only, hash-chained record of every state change.
//!
//! The audit module provides:
//! - Audit events for requirement changes, certifications, revocations and
//!   issuer transfers
//! - Hash-chained entries with sequence numbers and timestamps
//! - Chain verification
//! - The `AuditSink` trait with in-memory and JSON-lines backends

pub mod entry;
pub mod sink;

pub use entry::{verify_audit_chain, AuditEntry, AuditEvent, AuditEventKind, AuditId};
pub use sink::{AuditSink, FileAuditLog, MemoryAuditLog};
