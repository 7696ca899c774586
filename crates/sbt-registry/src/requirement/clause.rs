//! Requirement clauses and requirement sets.
//!
//! A requirement set is the ordered list of clauses attached to one
//! credential class, joined by a single combining relation. Clause order is
//! significant: claims are matched to clauses by index.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

use super::value::{Operator, Value};

/// Descriptive metadata for a clause. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    /// Declared type of the expected value. Never used for dispatch.
    pub type_tag: String,
    #[serde(default)]
    pub description: String,
}

impl Metadata {
    pub fn new(
        title: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            type_tag: type_tag.into(),
            description: description.into(),
        }
    }
}

/// One typed comparison condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementClause {
    pub metadata: Metadata,
    pub operator: Operator,
    pub expected: Value,
}

impl RequirementClause {
    /// Build a clause whose metadata type tag is derived from `expected`.
    pub fn new(title: impl Into<String>, operator: Operator, expected: Value) -> Self {
        let type_tag = expected.kind().as_tag();
        Self {
            metadata: Metadata::new(title, type_tag, ""),
            operator,
            expected,
        }
    }

    /// Attach a human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Whether the metadata type tag names the variant of `expected`.
    pub fn type_tag_matches(&self) -> bool {
        self.expected.kind().matches_tag(&self.metadata.type_tag)
    }

    /// Check the operator / value-variant pairing.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidRequirement` when the operator is not
    /// defined for the variant of the expected value.
    pub fn validate(&self, index: usize) -> Result<()> {
        let kind = self.expected.kind();
        if !self.operator.is_valid_for(kind) {
            return Err(RegistryError::InvalidRequirement {
                index,
                reason: format!("operator {} is not defined for {kind}", self.operator),
            });
        }
        Ok(())
    }
}

/// Logical relation joining every clause of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Every clause must pass.
    #[default]
    And,
    /// At least one clause must pass.
    Or,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "and" | "&&" => Ok(Self::And),
            "or" | "||" => Ok(Self::Or),
            other => Err(RegistryError::InvalidRequirement {
                index: 0,
                reason: format!("unknown combining relation '{other}'"),
            }),
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered clauses plus the relation that combines them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequirementSet {
    pub clauses: Vec<RequirementClause>,
    #[serde(default)]
    pub relation: Relation,
}

impl RequirementSet {
    pub fn new(clauses: Vec<RequirementClause>, relation: Relation) -> Self {
        Self { clauses, relation }
    }

    /// A set requiring every clause.
    pub fn all(clauses: Vec<RequirementClause>) -> Self {
        Self::new(clauses, Relation::And)
    }

    /// A set requiring at least one clause.
    pub fn any(clauses: Vec<RequirementClause>) -> Self {
        Self::new(clauses, Relation::Or)
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Validate every clause, reporting the first invalid one.
    pub fn validate(&self) -> Result<()> {
        self.clauses
            .iter()
            .enumerate()
            .try_for_each(|(i, clause)| clause.validate(i))
    }
}
