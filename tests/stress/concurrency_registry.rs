//! Concurrency test: parallel certification, revocation and verification.
//!
//! Validates that mutations are serialized, readers never observe a torn
//! state, and the audit chain stays intact under contention.

use std::sync::Arc;
use std::thread;

use sbt_registry::{
    verify_audit_chain, AuditEvent, AuditEventKind, CertificationState, ClassId, Operator,
    PrincipalId, Registry, RequirementClause, RequirementSet, Value,
};

fn issuer() -> PrincipalId {
    PrincipalId::new("issuer")
}

#[test]
fn stress_32_threads_certify_distinct_principals() {
    let registry = Arc::new(Registry::in_memory(issuer()).unwrap());

    let mut handles = Vec::new();
    for thread_id in 0..32 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let principal = PrincipalId::new(format!("p-{thread_id}-{i}"));
                registry
                    .certify(&issuer(), &principal, ClassId(1), true)
                    .expect("certify should succeed");
                assert!(registry.is_verified(&principal, ClassId(1)));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry.certifications(ClassId(1)).unwrap().len(), 1_600);

    let entries = registry.audit().entries().unwrap();
    assert_eq!(entries.len(), 1_600);
    assert!(verify_audit_chain(&entries).unwrap());
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.sequence, i as u64);
    }
}

#[test]
fn stress_contended_principal_ends_consistent_with_audit() {
    let registry = Arc::new(Registry::in_memory(issuer()).unwrap());
    let target = PrincipalId::new("contended");
    registry.certify(&issuer(), &target, ClassId(3), true).unwrap();

    let mut handles = Vec::new();
    for thread_id in 0..16 {
        let registry = Arc::clone(&registry);
        let target = target.clone();
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                if (thread_id + i) % 2 == 0 {
                    registry.certify(&issuer(), &target, ClassId(3), true).unwrap();
                } else {
                    // A record always exists, so revoke never fails.
                    registry.revoke(&issuer(), &target, ClassId(3)).unwrap();
                }
                let state = registry.status(&target, ClassId(3)).unwrap();
                assert_ne!(state, CertificationState::Absent);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let entries = registry.audit().entries().unwrap();
    assert_eq!(entries.len(), 1 + 16 * 100);
    assert!(verify_audit_chain(&entries).unwrap());

    let last = entries.last().unwrap();
    let expected = match last.event.kind() {
        AuditEventKind::Certified => CertificationState::Active,
        AuditEventKind::Revoked => CertificationState::Revoked,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(registry.status(&target, ClassId(3)).unwrap(), expected);

    let certified = entries
        .iter()
        .filter(|e| matches!(e.event, AuditEvent::Certified { .. }))
        .count();
    let record = registry.certification(&target, ClassId(3)).unwrap().unwrap();
    assert_eq!(record.issue_count as usize, certified);
}

#[test]
fn stress_readers_see_whole_requirement_sets() {
    let registry = Arc::new(Registry::in_memory(issuer()).unwrap());
    let set_of = |n: u64| {
        RequirementSet::all(
            (0..n)
                .map(|i| RequirementClause::new(format!("c{i}"), Operator::Equal, Value::Uint(n)))
                .collect(),
        )
    };
    registry.set_requirements(&issuer(), ClassId(9), set_of(1)).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for n in 1..=40 {
                registry
                    .set_requirements(&issuer(), ClassId(9), set_of(n))
                    .unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        readers.push(thread::spawn(move || {
            for _ in 0..200 {
                let set = registry.get_requirements(ClassId(9)).unwrap();
                let n = set.len() as u64;
                assert!(set
                    .clauses
                    .iter()
                    .all(|c| c.expected == Value::Uint(n)));
            }
        }));
    }

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(registry.get_requirements(ClassId(9)).unwrap().len(), 40);
}
