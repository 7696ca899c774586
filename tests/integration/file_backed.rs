//! Integration test: file-backed registry survives a restart.
//!
//! A registry built on `FileStore` + `FileAuditLog` is dropped and reopened
//! from the same directory; state, issuer and audit chain must carry over.

use std::path::Path;
use std::sync::Arc;

use sbt_registry::{
    AuditEventKind, CertificationState, ClassId, FileAuditLog, FileStore, Operator, PrincipalId,
    Registry, RegistryConfig, RegistryError, RequirementClause, RequirementSet, Value,
};

fn open(dir: &Path) -> sbt_registry::Result<Registry<FileStore>> {
    let store = FileStore::new(dir.join("records"))?;
    let audit = FileAuditLog::open(dir.join("audit.jsonl"))?;
    Registry::open(store, Arc::new(audit), RegistryConfig::default())
}

fn init(dir: &Path, issuer: &PrincipalId) -> Registry<FileStore> {
    let store = FileStore::new(dir.join("records")).unwrap();
    let audit = FileAuditLog::open(dir.join("audit.jsonl")).unwrap();
    Registry::initialize(
        issuer.clone(),
        store,
        Arc::new(audit),
        RegistryConfig::default(),
    )
    .expect("fresh directory should initialize")
}

fn membership() -> RequirementSet {
    RequirementSet::all(vec![
        RequirementClause::new("roles", Operator::StrictSubsetOf, Value::Uint(0b1111)),
        RequirementClause::new("sponsor", Operator::NotEqual, Value::principal("0xbanned")),
    ])
}

#[test]
fn file_backed_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = PrincipalId::new("issuer");
    let alice = PrincipalId::new("alice");
    let bob = PrincipalId::new("bob");

    {
        let registry = init(dir.path(), &issuer);
        registry
            .set_requirements(&issuer, ClassId(7), membership())
            .unwrap();
        registry.certify(&issuer, &alice, ClassId(7), true).unwrap();
        registry.certify(&issuer, &bob, ClassId(7), true).unwrap();
        registry.revoke(&issuer, &bob, ClassId(7)).unwrap();
    }

    let registry = open(dir.path()).expect("reopen should succeed");
    assert_eq!(registry.issuer().unwrap(), issuer);
    assert_eq!(registry.get_requirements(ClassId(7)).unwrap(), membership());
    assert!(registry.is_verified(&alice, ClassId(7)));
    assert_eq!(
        registry.status(&bob, ClassId(7)).unwrap(),
        CertificationState::Revoked
    );
    assert_eq!(registry.certifications(ClassId(7)).unwrap().len(), 2);

    let entries = registry.audit().entries().unwrap();
    assert_eq!(entries.len(), 4);
    assert!(registry.audit().verify().unwrap());

    // New entries continue the chain from disk.
    registry.certify(&issuer, &bob, ClassId(7), true).unwrap();
    let entries = registry.audit().entries().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[4].sequence, 4);
    assert_eq!(entries[4].previous_hash.as_deref(), Some(entries[3].hash.as_str()));
    assert_eq!(entries[4].event.kind(), AuditEventKind::Certified);
}

#[test]
fn file_backed_issuer_transfer_persists() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = PrincipalId::new("issuer");
    let successor = PrincipalId::new("successor");

    {
        let registry = init(dir.path(), &issuer);
        registry.transfer_issuer(&issuer, successor.clone()).unwrap();
    }

    let registry = open(dir.path()).unwrap();
    assert_eq!(registry.issuer().unwrap(), successor);
    assert!(matches!(
        registry.set_requirements(&issuer, ClassId(1), membership()),
        Err(RegistryError::Unauthorized { .. })
    ));
}

#[test]
fn file_backed_open_uninitialized_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(open(dir.path()), Err(RegistryError::NotFound(_))));
}

#[test]
fn file_backed_initialize_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = PrincipalId::new("issuer");
    drop(init(dir.path(), &issuer));

    let store = FileStore::new(dir.path().join("records")).unwrap();
    let audit = FileAuditLog::open(dir.path().join("audit.jsonl")).unwrap();
    let again = Registry::initialize(
        PrincipalId::new("usurper"),
        store,
        Arc::new(audit),
        RegistryConfig::default(),
    );
    assert!(matches!(again, Err(RegistryError::AlreadyInitialized)));
    assert_eq!(open(dir.path()).unwrap().issuer().unwrap(), issuer);
}

#[test]
fn file_backed_tampered_audit_log_refuses_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = PrincipalId::new("issuer");
    {
        let registry = init(dir.path(), &issuer);
        registry
            .certify(&issuer, &PrincipalId::new("alice"), ClassId(1), true)
            .unwrap();
        registry
            .certify(&issuer, &PrincipalId::new("bob"), ClassId(1), true)
            .unwrap();
    }

    let path = dir.path().join("audit.jsonl");
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, contents.replacen("\"alice\"", "\"mallory\"", 1)).unwrap();

    assert!(matches!(
        FileAuditLog::open(&path),
        Err(RegistryError::AuditChainBroken { sequence: 0 })
    ));
}

#[test]
fn file_backed_second_writer_rejected_while_first_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let issuer = PrincipalId::new("issuer");
    drop(init(dir.path(), &issuer));

    let first = open(dir.path()).unwrap();
    assert!(matches!(open(dir.path()), Err(RegistryError::Locked(_))));
    first
        .certify(&issuer, &PrincipalId::new("alice"), ClassId(1), true)
        .unwrap();
    drop(first);

    let second = open(dir.path()).unwrap();
    second
        .certify(&issuer, &PrincipalId::new("bob"), ClassId(1), true)
        .unwrap();
    drop(second);

    let registry = open(dir.path()).expect("chain written by successive handles should verify");
    assert!(registry.audit().verify().unwrap());
    assert_eq!(registry.audit().len().unwrap(), 2);
    assert_eq!(registry.certifications(ClassId(1)).unwrap().len(), 2);
}
