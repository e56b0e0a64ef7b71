//! Test fixtures for vrp-request.
//!
//! Provides:
//! - A capability document covering every wire shape the endpoint emits
//! - Real Las Vegas locations (from OpenStreetMap) for geographic waypoints

pub mod capabilities;
pub mod las_vegas_locations;

pub use capabilities::*;
pub use las_vegas_locations::*;
