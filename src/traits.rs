//! Seams for external collaborators.
//!
//! Adapters that produce distance/duration data implement these traits;
//! the compilation core only ever consumes their output.

use crate::context::Coordinates;
use crate::error::ProviderError;
use crate::matrix::Matrix;

/// Provides a distance/duration matrix for a set of locations.
///
/// The matrix is indexed by the provided location order. Distances are in
/// meters and durations in seconds.
pub trait MatrixProvider {
    fn matrix_for(&self, locations: &[Coordinates]) -> Result<Matrix, ProviderError>;
}
