//! Service-time heuristics for benchmark datasets.
//!
//! Benchmark files rarely say whether service times are seconds or
//! minutes. Both rules compare service times against the travel-time
//! ratio of the matrix (seconds per distance unit, median over sampled
//! off-diagonal pairs):
//!
//! - median service above `20 x ratio`: minutes, divide by 60;
//! - otherwise, one uniform non-zero value further than `2 x ratio` from
//!   `10 x ratio`: snap it to `10 x ratio`.
//!
//! At most one rule fires, and it is always reported.

use crate::diagnostics::Correction;
use crate::matrix::{Matrix, median, off_diagonal};
use crate::options::CompileOptions;

/// Upper bound on (duration / distance) samples taken from a matrix.
const MAX_RATIO_SAMPLES: usize = 1024;

/// Median seconds per distance unit over sampled off-diagonal pairs.
///
/// `None` without durations or without any positive distance.
pub fn seconds_per_distance_unit(matrix: &Matrix) -> Option<f64> {
    let durations = matrix.durations.as_ref()?;
    let pairs: Vec<(usize, usize, f64)> = off_diagonal(&matrix.distances)
        .filter(|(_, _, distance)| *distance > 0.0)
        .collect();
    let stride = (pairs.len() / MAX_RATIO_SAMPLES).max(1);

    let ratios = pairs
        .iter()
        .step_by(stride)
        .filter_map(|(i, j, distance)| {
            let duration = durations.get(*i)?.get(*j)?;
            Some(duration / distance)
        })
        .collect();
    median(ratios)
}

/// Applies the first service-time rule that fires, in place.
pub fn normalize_service_times(
    service: &mut [f64],
    matrix: &Matrix,
    options: &CompileOptions,
) -> Option<Correction> {
    let ratio = seconds_per_distance_unit(matrix)?;
    let positive: Vec<f64> = service.iter().copied().filter(|value| *value > 0.0).collect();
    let median_service = median(positive.clone())?;

    if median_service > options.service_minutes_ratio * ratio {
        for value in service.iter_mut() {
            *value /= 60.0;
        }
        return Some(Correction::ServiceMinutesToSeconds {
            median_service,
            seconds_per_unit: ratio,
        });
    }

    let uniform = positive.first().copied()?;
    if positive.iter().any(|value| *value != uniform) {
        return None;
    }
    let canonical = options.canonical_service_units * ratio;
    if (uniform - canonical).abs() <= options.service_uniform_tolerance * ratio {
        return None;
    }
    for value in service.iter_mut().filter(|value| **value > 0.0) {
        *value = canonical;
    }
    Some(Correction::ServiceTimeSnapped {
        from: uniform,
        to: canonical,
    })
}
