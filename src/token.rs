//! Data tokens: the vocabulary variants use to declare what data they need.
//!
//! Tokens arrive as strings (`"demands"`, `"matrix.distances"`,
//! `"fleet>=1"`, `"waypoints|matrix"`) and are parsed once into
//! [`DataToken`], so evaluation and assembly only ever match on a closed
//! set of variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TokenParseError;

/// Comparison operator of a threshold token such as `fleet>=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    AtLeast,
    AtMost,
    Exactly,
    MoreThan,
    LessThan,
}

impl Comparison {
    /// Two-character operators first so `>=` is never read as `>`.
    const ALL: [Self; 5] = [
        Self::AtLeast,
        Self::AtMost,
        Self::Exactly,
        Self::MoreThan,
        Self::LessThan,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Exactly => "==",
            Self::MoreThan => ">",
            Self::LessThan => "<",
        }
    }

    pub fn holds(self, actual: usize, expected: usize) -> bool {
        match self {
            Self::AtLeast => actual >= expected,
            Self::AtMost => actual <= expected,
            Self::Exactly => actual == expected,
            Self::MoreThan => actual > expected,
            Self::LessThan => actual < expected,
        }
    }
}

/// One datum, or an alternative between data, that a variant refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataToken {
    /// A bare field name, e.g. `demands`.
    Simple(String),
    /// A dotted path, e.g. `matrix.distances`.
    PathField(Vec<String>),
    /// A cardinality requirement, e.g. `fleet>=1`.
    Threshold {
        field: String,
        op: Comparison,
        value: usize,
    },
    /// Inclusive alternative, e.g. `waypoints|matrix`.
    Or(Box<DataToken>, Box<DataToken>),
}

impl DataToken {
    pub fn simple(name: impl Into<String>) -> Self {
        Self::Simple(name.into())
    }

    /// First path segment, i.e. the top-level payload field this token touches.
    ///
    /// Alternatives have no single root and return their left operand's.
    pub fn root(&self) -> &str {
        match self {
            Self::Simple(name) => name,
            Self::PathField(path) => path.first().map_or("", String::as_str),
            Self::Threshold { field, .. } => field.split('.').next().unwrap_or(field.as_str()),
            Self::Or(left, _) => left.root(),
        }
    }

    /// Whether this token (or any alternative of it) refers to the matrix.
    pub fn references_matrix(&self) -> bool {
        match self {
            Self::Or(left, right) => left.references_matrix() || right.references_matrix(),
            other => other.root() == "matrix",
        }
    }

    pub fn is_simple(&self, name: &str) -> bool {
        matches!(self, Self::Simple(own) if own == name)
    }

    pub fn is_path(&self, path: &[&str]) -> bool {
        matches!(self, Self::PathField(own) if own.iter().map(String::as_str).eq(path.iter().copied()))
    }
}

impl FromStr for DataToken {
    type Err = TokenParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TokenParseError::Empty);
        }

        if let Some((left, right)) = raw.split_once('|') {
            if left.trim().is_empty() || right.trim().is_empty() {
                return Err(TokenParseError::EmptyAlternative(raw.to_string()));
            }
            return Ok(Self::Or(Box::new(left.parse()?), Box::new(right.parse()?)));
        }

        for op in Comparison::ALL {
            if let Some((field, value)) = raw.split_once(op.symbol()) {
                let field = field.trim();
                let value = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| TokenParseError::InvalidThreshold(raw.to_string()))?;
                if field.is_empty() {
                    return Err(TokenParseError::InvalidThreshold(raw.to_string()));
                }
                return Ok(Self::Threshold {
                    field: field.to_string(),
                    op,
                    value,
                });
            }
        }

        if raw.contains('.') {
            let path: Vec<String> = raw.split('.').map(|segment| segment.trim().to_string()).collect();
            if path.iter().any(String::is_empty) {
                return Err(TokenParseError::EmptyPathSegment(raw.to_string()));
            }
            return Ok(Self::PathField(path));
        }

        Ok(Self::Simple(raw.to_string()))
    }
}

impl TryFrom<String> for DataToken {
    type Error = TokenParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<DataToken> for String {
    fn from(token: DataToken) -> Self {
        token.to_string()
    }
}

impl fmt::Display for DataToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(name) => f.write_str(name),
            Self::PathField(path) => f.write_str(&path.join(".")),
            Self::Threshold { field, op, value } => write!(f, "{field}{}{value}", op.symbol()),
            Self::Or(left, right) => write!(f, "{left}|{right}"),
        }
    }
}
