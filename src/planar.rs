//! Exact Euclidean matrices for planar (benchmark) datasets.
//!
//! Plane coordinates are taken as meters. Each unordered pair is evaluated
//! once with the lower index first, so the result is exactly symmetric.

use rayon::prelude::*;

use crate::context::{PlanePoint, Waypoint};
use crate::matrix::Matrix;
use crate::options::DurationUnit;

/// Whether at least `supermajority` of the waypoints carry plane X/Y.
pub fn is_planar(waypoints: &[Waypoint], supermajority: f64) -> bool {
    if waypoints.is_empty() {
        return false;
    }
    let planar = waypoints.iter().filter(|waypoint| waypoint.plane.is_some()).count();
    planar as f64 / waypoints.len() as f64 >= supermajority
}

/// Plane position per waypoint, using `(lon, lat)` as `(x, y)` for any
/// waypoint without one. `None` when a waypoint has neither.
pub fn planar_points(waypoints: &[Waypoint]) -> Option<Vec<PlanePoint>> {
    waypoints
        .iter()
        .map(|waypoint| {
            waypoint.plane.or_else(|| {
                waypoint
                    .location
                    .map(|location| PlanePoint::new(location.lon, location.lat))
            })
        })
        .collect()
}

/// Pairwise Euclidean distances, with durations at `speed_kph` in `unit`.
///
/// Durations are rounded to whole units; off-diagonal ones are at least 1.
pub fn build_euclidean_matrix(points: &[PlanePoint], speed_kph: f64, unit: DurationUnit) -> Matrix {
    let distances = euclidean_distances(points);
    let seconds_per_meter = 3.6 / speed_kph;
    let durations = distances
        .par_iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, meters)| {
                    if i == j {
                        0.0
                    } else {
                        unit.from_seconds(meters * seconds_per_meter).round().max(1.0)
                    }
                })
                .collect()
        })
        .collect();

    Matrix::new(distances).with_durations(durations)
}

/// Pairwise Euclidean distances only, with a zero diagonal.
pub fn euclidean_distances(points: &[PlanePoint]) -> Vec<Vec<f64>> {
    let n = points.len();
    (0..n)
        .into_par_iter()
        .map(|i| (0..n).map(|j| pair_distance(points, i, j)).collect())
        .collect()
}

fn pair_distance(points: &[PlanePoint], i: usize, j: usize) -> f64 {
    if i == j {
        return 0.0;
    }
    let (a, b) = (points[i.min(j)], points[i.max(j)]);
    (a.x - b.x).hypot(a.y - b.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_four_five() {
        let points = [PlanePoint::new(0.0, 0.0), PlanePoint::new(3.0, 4.0)];
        let matrix = build_euclidean_matrix(&points, 40.0, DurationUnit::Seconds);
        assert_eq!(matrix.distances, vec![vec![0.0, 5.0], vec![5.0, 0.0]]);
        // 5 m at 40 km/h is under a second: floored to 1
        assert_eq!(matrix.durations, Some(vec![vec![0.0, 1.0], vec![1.0, 0.0]]));
    }

    #[test]
    fn test_durations_in_minutes() {
        let points = [PlanePoint::new(0.0, 0.0), PlanePoint::new(0.0, 20_000.0)];
        // 20 km at 40 km/h = 30 minutes
        let matrix = build_euclidean_matrix(&points, 40.0, DurationUnit::Minutes);
        assert_eq!(matrix.durations.as_ref().map(|d| d[0][1]), Some(30.0));
    }

    #[test]
    fn test_single_point() {
        let matrix = build_euclidean_matrix(&[PlanePoint::new(2.0, 2.0)], 40.0, DurationUnit::Seconds);
        assert_eq!(matrix.distances, vec![vec![0.0]]);
        assert_eq!(matrix.durations, Some(vec![vec![0.0]]));
    }

    #[test]
    fn test_planar_detection_needs_supermajority() {
        let mostly_planar: Vec<Waypoint> = (0..5)
            .map(|i| {
                let waypoint = Waypoint::new(format!("w{i}"));
                if i < 4 { waypoint.plane(i as f64, 0.0) } else { waypoint.at(36.1, -115.1) }
            })
            .collect();
        assert!(is_planar(&mostly_planar, 0.8));
        assert!(!is_planar(&mostly_planar[3..], 0.8));
        assert!(!is_planar(&[], 0.8));
    }

    #[test]
    fn test_planar_points_fall_back_to_location() {
        let waypoints = vec![Waypoint::new("a").plane(1.0, 2.0), Waypoint::new("b").at(5.0, 7.0)];
        assert_eq!(
            planar_points(&waypoints),
            Some(vec![PlanePoint::new(1.0, 2.0), PlanePoint::new(7.0, 5.0)])
        );
        assert_eq!(planar_points(&[Waypoint::new("c")]), None);
    }
}
