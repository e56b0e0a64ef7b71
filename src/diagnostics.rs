//! Side channel for heuristic corrections.
//!
//! Corrections change solver input without failing the request, so each
//! one is logged and handed back to the caller next to the payload.

use std::fmt;

use serde::Serialize;

/// Where a synthesized matrix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixSource {
    Planar,
    Geodesic,
}

/// A non-fatal adjustment made while compiling a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
    /// Non-zero diagonal cells were reset to zero.
    DiagonalZeroed { cells: usize },
    /// An all-zero matrix of at most 2x2 was rebuilt from coordinates.
    DegenerateMatrixRecovered { size: usize },
    /// Distances looked like kilometers and were scaled to meters.
    KilometersRescaled { median: f64, factor: f64 },
    /// Durations were missing and derived from distances.
    DurationsBackfilled { speed_kph: f64 },
    /// Off-diagonal durations under one unit were raised to one.
    DurationFloorApplied { cells: usize },
    /// Service times looked like minutes and were divided by 60.
    ServiceMinutesToSeconds {
        median_service: f64,
        seconds_per_unit: f64,
    },
    /// A uniform service time was snapped to the canonical value.
    ServiceTimeSnapped { from: f64, to: f64 },
    /// No fleet was given, so a single default vehicle was created.
    FleetSynthesized { capacity: f64 },
    /// The variant takes exactly one vehicle; the rest were left out.
    FleetTruncated { dropped: usize },
    /// No matrix was given, so one was computed locally.
    MatrixSynthesized { source: MatrixSource },
    /// Every node time window was open and the field was omitted.
    EmptyTimeWindowsDropped,
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiagonalZeroed { cells } => write!(f, "reset {cells} diagonal cells to 0"),
            Self::DegenerateMatrixRecovered { size } => {
                write!(f, "recovered all-zero {size}x{size} matrix from coordinates")
            }
            Self::KilometersRescaled { median, factor } => {
                write!(f, "median distance {median} read as kilometers, scaled by {factor}")
            }
            Self::DurationsBackfilled { speed_kph } => {
                write!(f, "derived durations at {speed_kph} km/h")
            }
            Self::DurationFloorApplied { cells } => {
                write!(f, "raised {cells} off-diagonal durations to 1")
            }
            Self::ServiceMinutesToSeconds {
                median_service,
                seconds_per_unit,
            } => write!(
                f,
                "median service time {median_service} exceeds travel ratio {seconds_per_unit}, read as minutes"
            ),
            Self::ServiceTimeSnapped { from, to } => {
                write!(f, "uniform service time {from} snapped to {to}")
            }
            Self::FleetSynthesized { capacity } => {
                write!(f, "synthesized one vehicle with capacity {capacity}")
            }
            Self::FleetTruncated { dropped } => {
                write!(f, "kept the first vehicle, dropped {dropped}")
            }
            Self::MatrixSynthesized { source } => write!(f, "synthesized {source:?} matrix"),
            Self::EmptyTimeWindowsDropped => f.write_str("dropped node time windows that were all open"),
        }
    }
}

/// Every correction applied while compiling one request, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    corrections: Vec<Correction>,
}

impl Diagnostics {
    pub fn record(&mut self, correction: Correction) {
        tracing::info!(%correction, "request correction applied");
        self.corrections.push(correction);
    }

    pub fn extend(&mut self, corrections: impl IntoIterator<Item = Correction>) {
        for correction in corrections {
            self.record(correction);
        }
    }

    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn fired(&self, predicate: impl Fn(&Correction) -> bool) -> bool {
        self.corrections.iter().any(predicate)
    }
}
