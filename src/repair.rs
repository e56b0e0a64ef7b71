//! Unit normalization and value repair for distance/duration matrices.
//!
//! Upstream adapters do not reliably report units, so the rules below
//! infer them from magnitudes. They run in a fixed order:
//!
//! 1. all-zero matrices of at most 2x2 are rebuilt from coordinates,
//! 2. a sub-1 median off-diagonal distance means kilometers: scale by 1000,
//! 3. missing durations are derived at the nominal speed,
//! 4. off-diagonal durations under 1 are raised to 1.
//!
//! Shape defects are never repaired; they fail validation up front.

use crate::context::Coordinates;
use crate::diagnostics::Correction;
use crate::error::MatrixError;
use crate::haversine::haversine_m;
use crate::matrix::{Matrix, median};
use crate::options::CompileOptions;

/// Largest matrix side the degenerate recovery applies to.
const DEGENERATE_MAX_SIZE: usize = 2;

/// Repaired matrix plus every correction that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub matrix: Matrix,
    pub corrections: Vec<Correction>,
}

/// Validates `matrix` and applies every repair rule to a copy of it.
///
/// `coordinates` follow waypoint order and are only consulted for the
/// degenerate-matrix rule.
pub fn repair_matrix(
    matrix: &Matrix,
    coordinates: &[Option<Coordinates>],
    options: &CompileOptions,
) -> Result<RepairOutcome, MatrixError> {
    matrix.validate()?;

    let mut repaired = matrix.clone();
    let corrections = [
        zero_diagonals(&mut repaired),
        recover_degenerate(&mut repaired, coordinates),
        rescale_kilometers(&mut repaired, options),
        backfill_durations(&mut repaired, options),
        floor_durations(&mut repaired),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(RepairOutcome {
        matrix: repaired,
        corrections,
    })
}

/// Forces both diagonals to zero.
pub fn zero_diagonals(matrix: &mut Matrix) -> Option<Correction> {
    let mut cells = zero_diagonal(&mut matrix.distances);
    if let Some(durations) = matrix.durations.as_mut() {
        cells += zero_diagonal(durations);
    }
    (cells > 0).then_some(Correction::DiagonalZeroed { cells })
}

fn zero_diagonal(values: &mut [Vec<f64>]) -> usize {
    let mut cells = 0;
    for (i, row) in values.iter_mut().enumerate() {
        if let Some(cell) = row.get_mut(i) {
            if *cell != 0.0 {
                *cell = 0.0;
                cells += 1;
            }
        }
    }
    cells
}

/// Rebuilds an all-zero 2x2 matrix from great-circle distances.
///
/// All-zero durations are discarded so they are backfilled from the
/// recovered distances rather than floored to 1.
pub fn recover_degenerate(matrix: &mut Matrix, coordinates: &[Option<Coordinates>]) -> Option<Correction> {
    let size = matrix.len();
    if !(2..=DEGENERATE_MAX_SIZE).contains(&size) || !all_zero(&matrix.distances) {
        return None;
    }
    if matrix.durations.as_deref().is_some_and(|durations| !all_zero(durations)) {
        return None;
    }

    let Some(points) = coordinates
        .get(..size)
        .and_then(|known| known.iter().copied().collect::<Option<Vec<_>>>())
    else {
        tracing::warn!(size, "all-zero matrix left as is: waypoint coordinates unavailable");
        return None;
    };

    for i in 0..size {
        for j in (i + 1)..size {
            let meters = haversine_m(points[i], points[j]);
            matrix.distances[i][j] = meters;
            matrix.distances[j][i] = meters;
        }
    }
    matrix.durations = None;
    Some(Correction::DegenerateMatrixRecovered { size })
}

fn all_zero(values: &[Vec<f64>]) -> bool {
    values.iter().flatten().all(|value| *value == 0.0)
}

/// Scales distances by the km-to-m factor when their median reads as kilometers.
///
/// Uses the global median of strictly positive off-diagonal distances.
pub fn rescale_kilometers(matrix: &mut Matrix, options: &CompileOptions) -> Option<Correction> {
    let median = median(matrix.positive_off_diagonal_distances())?;
    if median >= options.km_median_threshold {
        return None;
    }

    let factor = options.km_to_m_factor;
    for value in matrix.distances.iter_mut().flatten() {
        *value *= factor;
    }
    Some(Correction::KilometersRescaled { median, factor })
}

/// Derives whole-unit durations from distances at the nominal speed.
///
/// Durations are in `options.duration_unit`, seconds by default.
pub fn backfill_durations(matrix: &mut Matrix, options: &CompileOptions) -> Option<Correction> {
    if matrix.durations.is_some() {
        return None;
    }

    let seconds_per_meter = options.seconds_per_meter();
    let unit = options.duration_unit;
    let durations = matrix
        .distances
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, meters)| {
                    if i == j {
                        0.0
                    } else {
                        unit.from_seconds(meters * seconds_per_meter).round()
                    }
                })
                .collect()
        })
        .collect();
    matrix.durations = Some(durations);
    Some(Correction::DurationsBackfilled {
        speed_kph: options.nominal_speed_kph,
    })
}

/// Raises off-diagonal durations below one time unit to one.
pub fn floor_durations(matrix: &mut Matrix) -> Option<Correction> {
    let durations = matrix.durations.as_mut()?;
    let mut cells = 0;
    for (i, row) in durations.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            if i != j && *value < 1.0 {
                *value = 1.0;
                cells += 1;
            }
        }
    }
    (cells > 0).then_some(Correction::DurationFloorApplied { cells })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CompileOptions {
        CompileOptions::default()
    }

    #[test]
    fn test_meter_scale_is_left_alone() {
        let mut matrix = Matrix::new(vec![vec![0.0, 1000.0], vec![1000.0, 0.0]]);
        assert_eq!(rescale_kilometers(&mut matrix, &options()), None);
        assert_eq!(matrix.distances[0][1], 1000.0);
    }

    #[test]
    fn test_kilometer_scale_is_multiplied() {
        let mut matrix = Matrix::new(vec![vec![0.0, 0.8], vec![0.8, 0.0]]);
        let correction = rescale_kilometers(&mut matrix, &options());
        assert_eq!(
            correction,
            Some(Correction::KilometersRescaled {
                median: 0.8,
                factor: 1000.0
            })
        );
        assert_eq!(matrix.distances, vec![vec![0.0, 800.0], vec![800.0, 0.0]]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut matrix = Matrix::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(rescale_kilometers(&mut matrix, &options()), None);
    }

    #[test]
    fn test_all_zero_matrix_has_no_median() {
        let mut matrix = Matrix::new(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(rescale_kilometers(&mut matrix, &options()), None);
    }

    #[test]
    fn test_backfill_at_nominal_speed() {
        // 10 km at 40 km/h = 900 s
        let mut matrix = Matrix::new(vec![vec![0.0, 10_000.0], vec![10_000.0, 0.0]]);
        assert!(backfill_durations(&mut matrix, &options()).is_some());
        assert_eq!(matrix.durations, Some(vec![vec![0.0, 900.0], vec![900.0, 0.0]]));
    }

    #[test]
    fn test_backfill_in_minutes() {
        let options = options().with_duration_unit(crate::options::DurationUnit::Minutes);
        let mut matrix = Matrix::new(vec![vec![0.0, 10_000.0], vec![10_000.0, 0.0]]);
        assert!(backfill_durations(&mut matrix, &options).is_some());
        assert_eq!(matrix.durations, Some(vec![vec![0.0, 15.0], vec![15.0, 0.0]]));
    }

    #[test]
    fn test_backfill_keeps_existing_durations() {
        let mut matrix = Matrix::new(vec![vec![0.0, 10.0], vec![10.0, 0.0]])
            .with_durations(vec![vec![0.0, 7.0], vec![7.0, 0.0]]);
        assert_eq!(backfill_durations(&mut matrix, &options()), None);
        assert_eq!(matrix.durations, Some(vec![vec![0.0, 7.0], vec![7.0, 0.0]]));
    }

    #[test]
    fn test_floor_raises_short_hops() {
        let mut matrix = Matrix::new(vec![vec![0.0, 3.0], vec![3.0, 0.0]])
            .with_durations(vec![vec![0.0, 0.0], vec![0.4, 0.0]]);
        assert_eq!(floor_durations(&mut matrix), Some(Correction::DurationFloorApplied { cells: 2 }));
        assert_eq!(matrix.durations, Some(vec![vec![0.0, 1.0], vec![1.0, 0.0]]));
    }

    #[test]
    fn test_degenerate_recovery_needs_coordinates() {
        let mut matrix = Matrix::new(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert_eq!(recover_degenerate(&mut matrix, &[None, None]), None);
        assert_eq!(matrix.distances, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_degenerate_recovery_skips_larger_matrices() {
        let mut matrix = Matrix::new(vec![vec![0.0; 3]; 3]);
        let coordinates = vec![Some(Coordinates::new(36.1, -115.1)); 3];
        assert_eq!(recover_degenerate(&mut matrix, &coordinates), None);
    }

    #[test]
    fn test_non_zero_diagonal_is_cleared() {
        let mut matrix = Matrix::new(vec![vec![5.0, 10.0], vec![10.0, 0.0]]);
        assert_eq!(zero_diagonals(&mut matrix), Some(Correction::DiagonalZeroed { cells: 1 }));
        assert_eq!(matrix.distances[0][0], 0.0);
    }

    #[test]
    fn test_repair_rejects_ragged_matrix() {
        let matrix = Matrix::new(vec![vec![0.0, 1.0], vec![1.0]]);
        assert!(matches!(
            repair_matrix(&matrix, &[], &options()),
            Err(MatrixError::Ragged { .. })
        ));
    }
}
