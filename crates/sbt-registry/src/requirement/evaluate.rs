//! Requirement evaluation: checking claims against a requirement set.
//!
//! Evaluation checks, per clause in order:
//! 1. Presence (a claim exists at the clause index)
//! 2. Comparison (`claim OP expected` holds)
//!
//! Clause results are then combined with the set's relation. A failed
//! evaluation is `Ok(false)`; only an operator / variant mismatch is an error.

use std::collections::BTreeMap;

use crate::error::Result;

use super::clause::{Relation, RequirementSet};
use super::value::Value;

/// Claimed values keyed by clause index.
pub type Claims = BTreeMap<usize, Value>;

/// Outcome of a single clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseOutcome {
    /// Position of the clause in the set.
    pub index: usize,
    /// Did the clause pass?
    pub passed: bool,
    /// Was the claim for this clause absent?
    pub missing: bool,
}

/// Result of evaluating claims against a requirement set.
///
/// Depends only on the set and the claims, so equal inputs always produce
/// equal evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Relation used to combine the clause outcomes.
    pub relation: Relation,
    /// Per-clause outcomes, in clause order.
    pub clauses: Vec<ClauseOutcome>,
    /// Overall result.
    pub passed: bool,
}

impl Evaluation {
    /// Indexes of clauses that did not pass.
    pub fn failed_indexes(&self) -> Vec<usize> {
        self.clauses
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.index)
            .collect()
    }
}

/// Evaluate `claims` against `set`, reporting every clause outcome.
///
/// All clauses are compared even when the result is already decided, so an
/// invalid comparison anywhere in the set is always reported.
///
/// An empty set passes under `and` and fails under `or`.
pub fn evaluate_detailed(set: &RequirementSet, claims: &Claims) -> Result<Evaluation> {
    let mut clauses = Vec::with_capacity(set.clauses.len());
    for (index, clause) in set.clauses.iter().enumerate() {
        let outcome = match claims.get(&index) {
            Some(claim) => ClauseOutcome {
                index,
                passed: clause.operator.apply(claim, &clause.expected)?,
                missing: false,
            },
            None => ClauseOutcome {
                index,
                passed: false,
                missing: true,
            },
        };
        clauses.push(outcome);
    }

    let passed = match set.relation {
        Relation::And => clauses.iter().all(|c| c.passed),
        Relation::Or => clauses.iter().any(|c| c.passed),
    };

    Ok(Evaluation {
        relation: set.relation,
        clauses,
        passed,
    })
}

/// Quick check: do `claims` satisfy `set`?
pub fn evaluate_requirements(set: &RequirementSet, claims: &Claims) -> Result<bool> {
    evaluate_detailed(set, claims).map(|e| e.passed)
}
