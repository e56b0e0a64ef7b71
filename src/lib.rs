//! vrp-request: compiles VRP solve requests.
//!
//! Resolves what a (solver, variant) pair needs from a capability document,
//! checks a trip context against it, repairs matrix units and shape-safe
//! value defects, and assembles the request body for a remote solver.
//! Everything here is synchronous and performs no I/O of its own.

pub mod assembler;
pub mod capability;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod evaluator;
pub mod haversine;
pub mod matrix;
pub mod options;
#[cfg(feature = "osrm")]
pub mod osrm;
pub mod planar;
pub mod repair;
pub mod service_time;
pub mod token;
pub mod traits;

pub use assembler::{CompiledRequest, RequestPayload, build_payload, build_payload_with};
pub use capability::{CapabilityDocument, VariantSpec, get_variant_spec};
pub use context::{TripContext, Vehicle, Waypoint};
pub use diagnostics::{Correction, Diagnostics};
pub use error::{CompileError, MatrixError};
pub use evaluator::{RequirementSource, TokenStatus, evaluate, evaluate_requirements};
pub use matrix::Matrix;
pub use options::CompileOptions;
pub use planar::build_euclidean_matrix;
pub use token::DataToken;
