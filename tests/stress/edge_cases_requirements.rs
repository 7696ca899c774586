//! Edge case tests: operator boundaries, set operators, empty sets, missing
//! and mistyped claims, malformed requirement sets.

use sbt_registry::{
    evaluate_detailed, evaluate_requirements, Claims, ClassId, Operator, PrincipalId, Registry,
    RegistryError, RequirementClause, RequirementSet, Value, ValueKind,
};

fn single(op: Operator, expected: Value) -> RequirementSet {
    RequirementSet::all(vec![RequirementClause::new("c", op, expected)])
}

fn eval(set: &RequirementSet, claim: Value) -> bool {
    evaluate_requirements(set, &Claims::from([(0, claim)])).unwrap()
}

// === Operator boundaries ===

#[test]
fn edge_ordering_boundaries() {
    let cases = [
        (Operator::GreaterOrEqual, 18, [(17, false), (18, true), (19, true)]),
        (Operator::GreaterThan, 18, [(17, false), (18, false), (19, true)]),
        (Operator::LessOrEqual, 18, [(17, true), (18, true), (19, false)]),
        (Operator::LessThan, 18, [(17, true), (18, false), (19, false)]),
    ];
    for (op, expected, rows) in cases {
        let set = single(op, Value::Uint(expected));
        for (claim, want) in rows {
            assert_eq!(
                eval(&set, Value::Uint(claim)),
                want,
                "{claim} {op} {expected}"
            );
        }
    }
}

#[test]
fn edge_uint_extremes() {
    let set = single(Operator::LessOrEqual, Value::Uint(u64::MAX));
    assert!(eval(&set, Value::Uint(u64::MAX)));
    assert!(eval(&set, Value::Uint(0)));

    let set = single(Operator::GreaterThan, Value::Uint(0));
    assert!(!eval(&set, Value::Uint(0)));
}

#[test]
fn edge_equality_on_every_variant() {
    let values = [
        Value::text("US"),
        Value::Uint(7),
        Value::principal("0xa"),
        Value::Bool(false),
    ];
    for v in values {
        assert!(eval(&single(Operator::Equal, v.clone()), v.clone()));
        assert!(!eval(&single(Operator::NotEqual, v.clone()), v));
    }
}

// === Set operators ===

#[test]
fn edge_text_token_sets() {
    let subset = single(Operator::SubsetOf, Value::text("US, CA, MX"));
    assert!(eval(&subset, Value::text("CA")));
    assert!(eval(&subset, Value::text("MX,US")));
    assert!(eval(&subset, Value::text("US,CA,MX")));
    assert!(eval(&subset, Value::text("")));
    assert!(!eval(&subset, Value::text("FR")));
    assert!(!eval(&subset, Value::text("US,FR")));

    let strict = single(Operator::StrictSubsetOf, Value::text("US,CA"));
    assert!(eval(&strict, Value::text("US")));
    assert!(!eval(&strict, Value::text("CA, US")));
    assert!(!eval(&strict, Value::text("US,CA,US")));
}

#[test]
fn edge_uint_bitsets() {
    let subset = single(Operator::SubsetOf, Value::Uint(0b1010));
    assert!(eval(&subset, Value::Uint(0b1000)));
    assert!(eval(&subset, Value::Uint(0)));
    assert!(eval(&subset, Value::Uint(0b1010)));
    assert!(!eval(&subset, Value::Uint(0b0001)));

    let strict = single(Operator::StrictSubsetOf, Value::Uint(0b1010));
    assert!(eval(&strict, Value::Uint(0b0010)));
    assert!(!eval(&strict, Value::Uint(0b1010)));
}

// === Relations and claims ===

#[test]
fn edge_empty_sets() {
    assert!(evaluate_requirements(&RequirementSet::all(vec![]), &Claims::new()).unwrap());
    assert!(!evaluate_requirements(&RequirementSet::any(vec![]), &Claims::new()).unwrap());
}

#[test]
fn edge_missing_claims_fail_their_clause() {
    let set = RequirementSet::any(vec![
        RequirementClause::new("a", Operator::Equal, Value::Uint(1)),
        RequirementClause::new("b", Operator::Equal, Value::Uint(2)),
    ]);
    assert!(evaluate_requirements(&set, &Claims::from([(1, Value::Uint(2))])).unwrap());
    assert!(!evaluate_requirements(&set, &Claims::new()).unwrap());

    let detail = evaluate_detailed(&set, &Claims::from([(1, Value::Uint(2))])).unwrap();
    assert!(detail.clauses[0].missing);
    assert!(!detail.clauses[0].passed);
    assert!(detail.clauses[1].passed);
}

#[test]
fn edge_extra_claims_ignored() {
    let set = single(Operator::Equal, Value::Bool(true));
    let claims = Claims::from([(0, Value::Bool(true)), (5, Value::text("ignored"))]);
    assert!(evaluate_requirements(&set, &claims).unwrap());
}

#[test]
fn edge_mistyped_claim_is_an_error() {
    let set = single(Operator::GreaterOrEqual, Value::Uint(18));
    let result = evaluate_requirements(&set, &Claims::from([(0, Value::text("21"))]));
    assert!(matches!(result, Err(RegistryError::InvalidComparison(_))));
}

// === Validation at the registry boundary ===

#[test]
fn edge_invalid_operator_variant_pairs_rejected() {
    let issuer = PrincipalId::new("issuer");
    let registry = Registry::in_memory(issuer.clone()).unwrap();

    for op in Operator::ALL {
        for expected in [
            Value::text("x"),
            Value::Uint(1),
            Value::principal("0xa"),
            Value::Bool(true),
        ] {
            let kind: ValueKind = expected.kind();
            let result = registry.set_requirements(&issuer, ClassId(1), single(op, expected));
            if op.is_valid_for(kind) {
                assert!(result.is_ok(), "{op} on {kind} should be accepted");
            } else {
                assert!(
                    matches!(result, Err(RegistryError::InvalidRequirement { .. })),
                    "{op} on {kind} should be rejected"
                );
            }
        }
    }
}

#[test]
fn edge_invalid_clause_index_reported() {
    let issuer = PrincipalId::new("issuer");
    let registry = Registry::in_memory(issuer.clone()).unwrap();
    let set = RequirementSet::all(vec![
        RequirementClause::new("ok", Operator::Equal, Value::Uint(1)),
        RequirementClause::new("ok", Operator::Equal, Value::Uint(2)),
        RequirementClause::new("bad", Operator::SubsetOf, Value::Bool(true)),
    ]);
    match registry.set_requirements(&issuer, ClassId(1), set) {
        Err(RegistryError::InvalidRequirement { index, .. }) => assert_eq!(index, 2),
        other => panic!("expected InvalidRequirement, got {other:?}"),
    }
}
