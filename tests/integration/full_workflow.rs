//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Publish requirements for a credential class
//! 2. Evaluate claims against them
//! 3. Certify principals that pass
//! 4. Revoke and re-certify
//! 5. Hand over the issuer role
//! 6. Query and verify the audit log

use sbt_registry::{
    query_audit, verify_audit_chain, AuditEvent, AuditEventKind, AuditQuery, CertificationState,
    Claims, ClassId, Operator, PrincipalId, Registry, RegistryError, RequirementClause,
    RequirementSet, RevocationReason, Value,
};

const ADULT: ClassId = ClassId(1);
const RESIDENT: ClassId = ClassId(2);

fn adult_requirements() -> RequirementSet {
    RequirementSet::all(vec![RequirementClause::new(
        "adult",
        Operator::GreaterOrEqual,
        Value::Uint(18),
    )
    .with_description("age in whole years")])
}

fn resident_requirements() -> RequirementSet {
    RequirementSet::any(vec![
        RequirementClause::new("country", Operator::SubsetOf, Value::text("US,CA")),
        RequirementClause::new("permit", Operator::Equal, Value::Bool(true)),
    ])
}

#[test]
fn full_workflow_requirements_to_audit() {
    let issuer = PrincipalId::new("0xissuer");
    let alice = PrincipalId::new("0xa");
    let bob = PrincipalId::new("0xb");
    let registry = Registry::in_memory(issuer.clone()).expect("registry should initialize");

    // ── Step 1: Publish requirements ────────────────────────────────────
    assert!(registry
        .set_requirements(&issuer, ADULT, adult_requirements())
        .unwrap());
    assert!(registry
        .set_requirements(&issuer, RESIDENT, resident_requirements())
        .unwrap());
    assert_eq!(registry.get_requirements(ADULT).unwrap(), adult_requirements());
    assert_eq!(registry.requirement_classes().unwrap(), vec![ADULT, RESIDENT]);

    // ── Step 2: Evaluate claims ─────────────────────────────────────────
    let alice_claims = Claims::from([(0, Value::Uint(21))]);
    let bob_claims = Claims::from([(0, Value::Uint(15))]);
    assert!(registry.evaluate(ADULT, &alice_claims).unwrap());
    assert!(!registry.evaluate(ADULT, &bob_claims).unwrap());

    let resident_claims = Claims::from([(0, Value::text("CA"))]);
    assert!(registry.evaluate(RESIDENT, &resident_claims).unwrap());
    let detail = registry
        .evaluate_detailed(RESIDENT, &Claims::from([(0, Value::text("FR"))]))
        .unwrap();
    assert!(!detail.passed);
    assert_eq!(detail.failed_indexes(), vec![0, 1]);

    // ── Step 3: Certify principals that pass ────────────────────────────
    for (principal, claims) in [(&alice, &alice_claims), (&bob, &bob_claims)] {
        let attested = registry.evaluate(ADULT, claims).unwrap();
        if attested {
            registry.certify(&issuer, principal, ADULT, attested).unwrap();
        } else {
            assert!(matches!(
                registry.certify(&issuer, principal, ADULT, attested),
                Err(RegistryError::AttestationRejected { .. })
            ));
        }
    }
    assert!(registry.is_verified(&alice, ADULT));
    assert!(!registry.is_verified(&bob, ADULT));
    assert!(!registry.is_verified(&alice, RESIDENT));

    // ── Step 4: Revoke and re-certify ───────────────────────────────────
    registry
        .revoke_with_reason(&issuer, &alice, ADULT, RevocationReason::Compromised)
        .unwrap();
    assert!(!registry.is_verified(&alice, ADULT));
    let record = registry.certification(&alice, ADULT).unwrap().unwrap();
    assert_eq!(record.state, CertificationState::Revoked);
    assert_eq!(record.revocation_reason, Some(RevocationReason::Compromised));

    registry.certify(&issuer, &alice, ADULT, true).unwrap();
    assert!(registry.is_verified(&alice, ADULT));
    assert_eq!(
        registry.certification(&alice, ADULT).unwrap().unwrap().issue_count,
        2
    );

    // ── Step 5: Hand over the issuer role ───────────────────────────────
    let successor = PrincipalId::new("0xsuccessor");
    registry.transfer_issuer(&issuer, successor.clone()).unwrap();
    assert!(matches!(
        registry.revoke(&issuer, &alice, ADULT),
        Err(RegistryError::Unauthorized { .. })
    ));
    registry.revoke(&successor, &alice, ADULT).unwrap();

    // ── Step 6: Query and verify the audit log ──────────────────────────
    let entries = registry.audit().entries().unwrap();
    assert_eq!(entries.len(), 7);
    assert!(verify_audit_chain(&entries).unwrap());

    let alice_history = query_audit(&entries, &AuditQuery::new().principal(alice.clone()));
    let kinds: Vec<AuditEventKind> = alice_history.iter().map(|e| e.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventKind::Certified,
            AuditEventKind::Revoked,
            AuditEventKind::Certified,
            AuditEventKind::Revoked,
        ]
    );

    match &entries[5].event {
        AuditEvent::IssuerTransferred {
            previous,
            new_issuer,
        } => {
            assert_eq!(previous, &issuer);
            assert_eq!(new_issuer, &successor);
        }
        other => panic!("expected issuer transfer, got {other:?}"),
    }
}

#[test]
fn full_workflow_failed_calls_leave_no_trace() {
    let issuer = PrincipalId::new("issuer");
    let mallory = PrincipalId::new("mallory");
    let registry = Registry::in_memory(issuer.clone()).unwrap();

    let _ = registry.set_requirements(&mallory, ADULT, adult_requirements());
    let _ = registry.certify(&mallory, &mallory, ADULT, true);
    let _ = registry.certify(&issuer, &mallory, ADULT, false);
    let _ = registry.revoke(&issuer, &mallory, ADULT);
    let _ = registry.set_requirements(
        &issuer,
        ADULT,
        RequirementSet::all(vec![RequirementClause::new(
            "flag",
            Operator::LessThan,
            Value::Bool(true),
        )]),
    );

    assert!(registry.audit().entries().unwrap().is_empty());
    assert!(registry.requirement_classes().unwrap().is_empty());
    assert!(registry.certifications(ADULT).unwrap().is_empty());
    assert_eq!(registry.issuer().unwrap(), issuer);
}
