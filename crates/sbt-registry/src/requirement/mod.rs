//! Requirement engine: typed eligibility requirements per credential class.
//!
//! The requirement module provides:
//! - Typed values and the closed comparison-operator set
//! - Requirement clauses and ordered requirement sets
//! - Operator / variant validation
//! - Pure evaluation of claims against a requirement set

pub mod clause;
pub mod evaluate;
pub mod value;

pub use clause::{Metadata, Relation, RequirementClause, RequirementSet};
pub use evaluate::{
    evaluate_detailed, evaluate_requirements, ClauseOutcome, Claims, Evaluation,
};
pub use value::{Operator, Value, ValueKind};
