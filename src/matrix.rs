//! Square distance/duration matrices and their shape checks.

use serde::{Deserialize, Serialize};

use crate::error::MatrixError;

/// Pairwise distances (meters) and optional durations (seconds).
///
/// Both are indexed by waypoint order. Diagonals are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub distances: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<Vec<Vec<f64>>>,
}

impl Matrix {
    pub fn new(distances: Vec<Vec<f64>>) -> Self {
        Self {
            distances,
            durations: None,
        }
    }

    pub fn with_durations(mut self, durations: Vec<Vec<f64>>) -> Self {
        self.durations = Some(durations);
        self
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Checks squareness, parallel durations and entry values.
    pub fn validate(&self) -> Result<(), MatrixError> {
        let n = check_square(&self.distances)?;
        if let Some(durations) = &self.durations {
            let found = check_square(durations)?;
            if found != n {
                return Err(MatrixError::DurationsMismatch { expected: n, found });
            }
            check_entries(durations)?;
        }
        check_entries(&self.distances)
    }

    pub fn is_symmetric(&self) -> bool {
        symmetric(&self.distances) && self.durations.as_deref().is_none_or(symmetric)
    }

    /// Strictly positive off-diagonal distances, row-major.
    pub fn positive_off_diagonal_distances(&self) -> Vec<f64> {
        off_diagonal(&self.distances)
            .map(|(_, _, value)| value)
            .filter(|value| *value > 0.0)
            .collect()
    }
}

/// Yields `(row, col, value)` for every off-diagonal cell.
pub(crate) fn off_diagonal(values: &[Vec<f64>]) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
    values.iter().enumerate().flat_map(|(i, row)| {
        row.iter()
            .enumerate()
            .filter(move |(j, _)| *j != i)
            .map(move |(j, value)| (i, j, *value))
    })
}

/// Median of the given values; the mean of the middle pair for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn check_square(values: &[Vec<f64>]) -> Result<usize, MatrixError> {
    let rows = values.len();
    let Some(first) = values.first() else {
        return Err(MatrixError::Empty);
    };
    let cols = first.len();
    for (row, entries) in values.iter().enumerate().skip(1) {
        if entries.len() != cols {
            return Err(MatrixError::Ragged {
                row,
                expected: cols,
                found: entries.len(),
            });
        }
    }
    if cols != rows {
        return Err(MatrixError::NotSquare { rows, cols });
    }
    Ok(rows)
}

fn check_entries(values: &[Vec<f64>]) -> Result<(), MatrixError> {
    for (row, entries) in values.iter().enumerate() {
        for (col, value) in entries.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                return Err(MatrixError::InvalidEntry {
                    row,
                    col,
                    value: *value,
                });
            }
        }
    }
    Ok(())
}

fn symmetric(values: &[Vec<f64>]) -> bool {
    off_diagonal(values).all(|(i, j, value)| values.get(j).and_then(|row| row.get(i)) == Some(&value))
}
