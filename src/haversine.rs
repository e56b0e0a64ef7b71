//! Haversine distance matrix provider (fallback when no road network data).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than a routing engine (ignores roads) but always available.

use crate::context::Coordinates;
use crate::error::ProviderError;
use crate::matrix::Matrix;
use crate::options::DEFAULT_SPEED_KPH;
use crate::traits::MatrixProvider;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_m(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Haversine-based distance matrix provider.
///
/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kph: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kph: DEFAULT_SPEED_KPH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kph: f64) -> Self {
        Self { speed_kph }
    }

    /// Convert a distance in meters to whole seconds of travel.
    pub fn meters_to_seconds(&self, meters: f64) -> f64 {
        (meters * 3.6 / self.speed_kph).round()
    }

    /// Distances only; one evaluation per unordered pair, mirrored.
    pub fn distances(locations: &[Coordinates]) -> Vec<Vec<f64>> {
        let n = locations.len();
        let mut distances = vec![vec![0.0; n]; n];
        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate().skip(i + 1) {
                let meters = haversine_m(*from, *to);
                distances[i][j] = meters;
                distances[j][i] = meters;
            }
        }
        distances
    }
}

impl MatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinates]) -> Result<Matrix, ProviderError> {
        let distances = Self::distances(locations);
        let durations = distances
            .iter()
            .map(|row| row.iter().map(|meters| self.meters_to_seconds(*meters)).collect())
            .collect();
        Ok(Matrix::new(distances).with_durations(durations))
    }
}
