//! Tunable knobs for request compilation.
//!
//! The defaults reproduce the thresholds existing fixtures were built
//! against; changing any of them changes compiled output.

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Nominal driving speed used when durations must be derived.
pub const DEFAULT_SPEED_KPH: f64 = 40.0;

/// A median off-diagonal distance below this is read as kilometers.
pub const KM_MEDIAN_THRESHOLD: f64 = 1.0;

/// Service times whose median exceeds this many seconds-per-unit ratios
/// are read as minutes.
pub const SERVICE_MINUTES_RATIO: f64 = 20.0;

/// Canonical uniform service time, in distance units of travel.
pub const CANONICAL_SERVICE_UNITS: f64 = 10.0;

/// Allowed distance (in ratios) from the canonical uniform service time.
pub const SERVICE_UNIFORM_TOLERANCE: f64 = 2.0;

/// Share of waypoints that must carry plane X/Y for a planar dataset.
pub const PLANAR_SUPERMAJORITY: f64 = 0.8;

/// When the benchmark service-time heuristics run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTimePolicy {
    /// Only for planar (benchmark) datasets.
    #[default]
    Auto,
    Always,
    Never,
}

/// Unit of durations derived here, by the planar engine and by backfill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl DurationUnit {
    pub fn from_seconds(self, seconds: f64) -> f64 {
        match self {
            Self::Seconds => seconds,
            Self::Minutes => seconds / 60.0,
            Self::Hours => seconds / 3600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub nominal_speed_kph: f64,
    pub km_median_threshold: f64,
    pub km_to_m_factor: f64,
    pub service_minutes_ratio: f64,
    pub canonical_service_units: f64,
    pub service_uniform_tolerance: f64,
    pub service_time_policy: ServiceTimePolicy,
    pub planar_supermajority: f64,
    pub duration_unit: DurationUnit,
    /// Build a great-circle matrix when one is needed but missing.
    pub synthesize_geodesic_matrix: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            nominal_speed_kph: DEFAULT_SPEED_KPH,
            km_median_threshold: KM_MEDIAN_THRESHOLD,
            km_to_m_factor: 1000.0,
            service_minutes_ratio: SERVICE_MINUTES_RATIO,
            canonical_service_units: CANONICAL_SERVICE_UNITS,
            service_uniform_tolerance: SERVICE_UNIFORM_TOLERANCE,
            service_time_policy: ServiceTimePolicy::Auto,
            planar_supermajority: PLANAR_SUPERMAJORITY,
            duration_unit: DurationUnit::Seconds,
            synthesize_geodesic_matrix: false,
        }
    }
}

impl CompileOptions {
    pub fn with_speed_kph(mut self, speed_kph: f64) -> Self {
        self.nominal_speed_kph = speed_kph;
        self
    }

    pub fn with_service_time_policy(mut self, policy: ServiceTimePolicy) -> Self {
        self.service_time_policy = policy;
        self
    }

    pub fn with_geodesic_fallback(mut self, enabled: bool) -> Self {
        self.synthesize_geodesic_matrix = enabled;
        self
    }

    pub fn with_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Seconds needed to cover one meter at the nominal speed.
    pub fn seconds_per_meter(&self) -> f64 {
        3.6 / self.nominal_speed_kph
    }

    /// Rejects settings that would put non-finite numbers in a payload.
    pub fn validate(&self) -> Result<(), CompileError> {
        if !(self.nominal_speed_kph.is_finite() && self.nominal_speed_kph > 0.0) {
            return Err(CompileError::InvalidSpeed(self.nominal_speed_kph));
        }
        if !(self.km_to_m_factor.is_finite() && self.km_to_m_factor > 0.0) {
            return Err(CompileError::InvalidScale(self.km_to_m_factor));
        }
        Ok(())
    }
}
