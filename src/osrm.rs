//! OSRM HTTP adapter for distance matrices.
//!
//! Requests both `distance` and `duration` annotations from the table
//! service. Callers decide when to fetch; the compilation core only
//! consumes the resulting [`Matrix`].

use serde::Deserialize;

use crate::context::Coordinates;
use crate::error::{MatrixError, ProviderError};
use crate::matrix::Matrix;
use crate::traits::MatrixProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_url(&self, locations: &[Coordinates]) -> String {
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.lon, location.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?annotations=duration,distance",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }
}

impl MatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[Coordinates]) -> Result<Matrix, ProviderError> {
        if locations.is_empty() {
            return Err(MatrixError::Empty.into());
        }

        let body = self
            .client
            .get(self.table_url(locations))
            .send()?
            .error_for_status()?
            .json::<OsrmTableResponse>()?;

        let matrix = body.into_matrix()?;
        tracing::debug!(size = matrix.len(), "fetched OSRM table");
        Ok(matrix)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    /// Unroutable pairs come back as `null` and are rejected.
    fn into_matrix(self) -> Result<Matrix, ProviderError> {
        let distances = self
            .distances
            .ok_or(ProviderError::MissingAnnotation("distances"))
            .and_then(complete)?;
        let mut matrix = Matrix::new(distances);
        if let Some(durations) = self.durations {
            matrix.durations = Some(complete(durations)?);
        }
        matrix.validate()?;
        Ok(matrix)
    }
}

fn complete(rows: Vec<Vec<Option<f64>>>) -> Result<Vec<Vec<f64>>, ProviderError> {
    rows.into_iter()
        .enumerate()
        .map(|(from, row)| {
            row.into_iter()
                .enumerate()
                .map(|(to, value)| value.ok_or(ProviderError::Unroutable { from, to }))
                .collect()
        })
        .collect()
}
