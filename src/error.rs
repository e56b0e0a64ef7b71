//! Error types for request compilation.

use thiserror::Error;

use crate::token::DataToken;

/// Fatal failures while compiling a solver request.
///
/// No partial payload is ever produced alongside one of these.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The capability document has no spec for this (solver, variant) pair.
    #[error("solver `{solver}` does not support variant `{variant}`")]
    UnsupportedCombination { solver: String, variant: String },
    /// Required data is absent and could not be synthesized.
    #[error("missing required data: {}", join_tokens(.missing))]
    InsufficientData { missing: Vec<DataToken> },
    /// The supplied matrix is malformed.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    /// The depot index does not address a waypoint.
    #[error("depot index {index} is out of range for {len} waypoints")]
    InvalidDepot { index: usize, len: usize },
    /// The nominal speed must be finite and positive.
    #[error("nominal speed must be a positive number of km/h, got {0}")]
    InvalidSpeed(f64),
    /// The km-to-m factor must be finite and positive.
    #[error("kilometer scale factor must be positive, got {0}")]
    InvalidScale(f64),
    /// The capability document could not be decoded.
    #[error("malformed capability document: {0}")]
    Document(#[from] serde_json::Error),
}

/// Shape and value defects in a distance/duration matrix.
///
/// These are reported, never repaired.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("matrix is empty")]
    Empty,
    #[error("matrix has {rows} rows but {cols} columns")]
    NotSquare { rows: usize, cols: usize },
    #[error("row {row} has {found} entries, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("durations are {found}x{found} but distances are {expected}x{expected}")]
    DurationsMismatch { expected: usize, found: usize },
    #[error("entry ({row}, {col}) is negative or not finite: {value}")]
    InvalidEntry { row: usize, col: usize, value: f64 },
}

/// Malformed data token strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenParseError {
    #[error("data token is empty")]
    Empty,
    #[error("alternative token `{0}` has an empty operand")]
    EmptyAlternative(String),
    #[error("threshold token `{0}` has an invalid operand")]
    InvalidThreshold(String),
    #[error("path token `{0}` has an empty segment")]
    EmptyPathSegment(String),
}

/// Failures raised by distance-matrix adapters.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[cfg(feature = "osrm")]
    #[error("matrix request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("matrix provider returned no {0}")]
    MissingAnnotation(&'static str),
    #[error("no route from location {from} to location {to}")]
    Unroutable { from: usize, to: usize },
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

fn join_tokens(tokens: &[DataToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
