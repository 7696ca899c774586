//! Typed values and the closed comparison-operator set.
//!
//! Comparison is always `claim OP expected`. Equality and ordering are
//! defined only within one variant; comparing across variants is an error,
//! never a `false` result.
//!
//! Set operators use the following encodings:
//!
//! - **text**: a comma-separated token set. Tokens are trimmed, empty
//!   tokens are dropped and duplicates collapse, so `"US, CA"` and
//!   `"CA,US,,US"` denote the same set.
//! - **uint**: a bit set: bit `i` set means element `i` is a member.
//!
//! `claim ⊆ expected` holds when every member of the claim is a member of
//! the expected set; `claim ⊂ expected` additionally requires the two sets
//! to differ.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::identity::PrincipalId;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single typed value. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Uint(u64),
    Principal(PrincipalId),
    Bool(bool),
}

impl Value {
    /// The variant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Uint(_) => ValueKind::Uint,
            Self::Principal(_) => ValueKind::Principal,
            Self::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn principal(id: impl Into<String>) -> Self {
        Self::Principal(PrincipalId::new(id))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "text {s:?}"),
            Self::Uint(n) => write!(f, "uint {n}"),
            Self::Principal(p) => write!(f, "principal {p}"),
            Self::Bool(b) => write!(f, "bool {b}"),
        }
    }
}

/// Variant discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Uint,
    Principal,
    Bool,
}

impl ValueKind {
    /// Canonical type tag, as expected in clause metadata.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Uint => "uint",
            Self::Principal => "principal",
            Self::Bool => "bool",
        }
    }

    /// Whether `tag` names this kind (case-insensitive).
    pub fn matches_tag(&self, tag: &str) -> bool {
        tag.trim().eq_ignore_ascii_case(self.as_tag())
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// Comparison operator of a requirement clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `⊆`
    SubsetOf,
    /// `⊂`
    StrictSubsetOf,
    LessThan,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    GreaterThan,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::SubsetOf,
        Self::StrictSubsetOf,
        Self::LessThan,
        Self::LessOrEqual,
        Self::Equal,
        Self::NotEqual,
        Self::GreaterOrEqual,
        Self::GreaterThan,
    ];

    /// Mathematical symbol for this operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::SubsetOf => "⊆",
            Self::StrictSubsetOf => "⊂",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterOrEqual => ">=",
            Self::GreaterThan => ">",
        }
    }

    /// Stable snake_case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubsetOf => "subset_of",
            Self::StrictSubsetOf => "strict_subset_of",
            Self::LessThan => "less_than",
            Self::LessOrEqual => "less_or_equal",
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::GreaterThan => "greater_than",
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessOrEqual | Self::GreaterOrEqual | Self::GreaterThan
        )
    }

    fn is_set(&self) -> bool {
        matches!(self, Self::SubsetOf | Self::StrictSubsetOf)
    }

    /// Whether this operator is defined for values of `kind`.
    ///
    /// Ordering operators apply only to `uint`; set operators to `text` and
    /// `uint`; `==` and `!=` to every kind.
    pub fn is_valid_for(&self, kind: ValueKind) -> bool {
        if self.is_ordering() {
            kind == ValueKind::Uint
        } else if self.is_set() {
            matches!(kind, ValueKind::Text | ValueKind::Uint)
        } else {
            true
        }
    }

    /// Compare `claim OP expected`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidComparison` when the two values are of
    /// different variants or the operator is not defined for their variant.
    pub fn apply(&self, claim: &Value, expected: &Value) -> Result<bool> {
        if claim.kind() != expected.kind() {
            return Err(RegistryError::InvalidComparison(format!(
                "cannot compare {} with {}",
                claim.kind(),
                expected.kind()
            )));
        }
        if !self.is_valid_for(expected.kind()) {
            return Err(RegistryError::InvalidComparison(format!(
                "operator {} is not defined for {}",
                self.symbol(),
                expected.kind()
            )));
        }

        let result = match (claim, expected) {
            (Value::Uint(a), Value::Uint(b)) => match self {
                Self::SubsetOf => a & !b == 0,
                Self::StrictSubsetOf => a & !b == 0 && a != b,
                Self::LessThan => a < b,
                Self::LessOrEqual => a <= b,
                Self::Equal => a == b,
                Self::NotEqual => a != b,
                Self::GreaterOrEqual => a >= b,
                Self::GreaterThan => a > b,
            },
            (Value::Text(a), Value::Text(b)) if self.is_set() => {
                let (a, b) = (token_set(a), token_set(b));
                a.is_subset(&b) && (*self == Self::SubsetOf || a != b)
            }
            _ => match self {
                Self::Equal => claim == expected,
                _ => claim != expected,
            },
        };

        Ok(result)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = RegistryError;

    /// Accepts either the snake_case name or the symbol (`<=`, `⊆`, ...).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s || op.symbol() == s)
            .ok_or_else(|| RegistryError::InvalidComparison(format!("unknown operator '{s}'")))
    }
}

/// Split a text value into its comma-separated token set.
fn token_set(s: &str) -> BTreeSet<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}
