//! The caller's problem instance before it is compiled into a request.
//!
//! A [`TripContext`] is rebuilt for every solve attempt. Nothing in this
//! crate mutates one; the assembler reads it and produces fresh output.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::matrix::Matrix;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Abstract plane position used by benchmark datasets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `[start, end]` in seconds; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow(pub Option<f64>, pub Option<f64>);

impl TimeWindow {
    pub const fn new(start: f64, end: f64) -> Self {
        Self(Some(start), Some(end))
    }

    pub const fn start(&self) -> Option<f64> {
        self.0
    }

    pub const fn end(&self) -> Option<f64> {
        self.1
    }

    /// Both bounds open.
    pub const fn is_open(&self) -> bool {
        self.0.is_none() && self.1.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Depot,
    #[default]
    Stop,
    Pickup,
    Delivery,
}

/// A stop to be routed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Waypoint {
    pub id: String,
    pub location: Option<Coordinates>,
    pub plane: Option<PlanePoint>,
    pub demand: Option<f64>,
    /// Service duration in seconds.
    pub service: Option<f64>,
    pub time_window: Option<TimeWindow>,
    /// Links a pickup to its delivery.
    pub pairing: Option<String>,
    pub role: WaypointRole,
}

impl Waypoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.location = Some(Coordinates::new(lat, lon));
        self
    }

    pub fn plane(mut self, x: f64, y: f64) -> Self {
        self.plane = Some(PlanePoint::new(x, y));
        self
    }

    pub fn demand(mut self, demand: f64) -> Self {
        self.demand = Some(demand);
        self
    }

    pub fn service(mut self, seconds: f64) -> Self {
        self.service = Some(seconds);
        self
    }

    pub fn window(mut self, start: f64, end: f64) -> Self {
        self.time_window = Some(TimeWindow::new(start, end));
        self
    }

    pub fn depot(mut self) -> Self {
        self.role = WaypointRole::Depot;
        self
    }

    pub fn pickup(mut self, pairing: impl Into<String>) -> Self {
        self.role = WaypointRole::Pickup;
        self.pairing = Some(pairing.into());
        self
    }

    pub fn delivery(mut self, pairing: impl Into<String>) -> Self {
        self.role = WaypointRole::Delivery;
        self.pairing = Some(pairing.into());
        self
    }
}

/// A vehicle of the fleet. Start/end default to the depot when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vehicle {
    pub id: String,
    pub capacity: Vec<f64>,
    /// Operating window `(start, end)` in seconds.
    pub time_window: Option<(f64, f64)>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, capacity: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            capacity,
            ..Self::default()
        }
    }

    pub fn operating(mut self, start: f64, end: f64) -> Self {
        self.time_window = Some((start, end));
        self
    }

    pub fn between(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub distance: f64,
    pub time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupDeliveryPair {
    pub pickup: usize,
    pub delivery: usize,
    pub quantity: i64,
}

/// One solve attempt's worth of problem data and solver selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripContext {
    pub solver: String,
    pub variant: String,
    pub adapter: Option<String>,
    pub depot_index: usize,
    pub waypoints: Vec<Waypoint>,
    pub fleet: Vec<Vehicle>,
    pub matrix: Option<Matrix>,
    pub weights: Option<ObjectiveWeights>,
    /// Solver-specific fields reachable through dotted tokens.
    pub extras: Map<String, Value>,
}

impl TripContext {
    pub fn new(solver: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            solver: solver.into(),
            variant: variant.into(),
            ..Self::default()
        }
    }

    pub fn depot(mut self, index: usize) -> Self {
        self.depot_index = index;
        self
    }

    pub fn waypoint(mut self, waypoint: Waypoint) -> Self {
        self.waypoints.push(waypoint);
        self
    }

    pub fn vehicle(mut self, vehicle: Vehicle) -> Self {
        self.fleet.push(vehicle);
        self
    }

    pub fn matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn weights(mut self, distance: f64, time: f64) -> Self {
        self.weights = Some(ObjectiveWeights { distance, time });
        self
    }

    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = Some(name.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Per-waypoint demands (missing ones as zero), if any waypoint has one.
    pub fn demands(&self) -> Option<Vec<f64>> {
        per_waypoint(&self.waypoints, |waypoint| waypoint.demand)
    }

    /// Per-waypoint service seconds (missing ones as zero), if any waypoint has one.
    pub fn service_times(&self) -> Option<Vec<f64>> {
        per_waypoint(&self.waypoints, |waypoint| waypoint.service)
    }

    /// Per-waypoint windows (missing ones fully open), if any waypoint has one.
    pub fn time_windows(&self) -> Option<Vec<TimeWindow>> {
        self.waypoints
            .iter()
            .any(|waypoint| waypoint.time_window.is_some())
            .then(|| {
                self.waypoints
                    .iter()
                    .map(|waypoint| waypoint.time_window.unwrap_or_default())
                    .collect()
            })
    }

    /// Sum of demands over every waypoint except the depot, whether it is
    /// addressed by `depot_index` or marked with the depot role.
    pub fn total_non_depot_demand(&self) -> f64 {
        self.waypoints
            .iter()
            .enumerate()
            .filter(|(index, waypoint)| *index != self.depot_index && waypoint.role != WaypointRole::Depot)
            .filter_map(|(_, waypoint)| waypoint.demand)
            .sum()
    }

    /// Pickups matched to the delivery sharing their pairing id.
    ///
    /// Quantity is the pickup's demand magnitude, or 1 when it has none.
    pub fn pickup_delivery_pairs(&self) -> Vec<PickupDeliveryPair> {
        self.waypoints
            .iter()
            .enumerate()
            .filter(|(_, waypoint)| waypoint.role == WaypointRole::Pickup)
            .filter_map(|(pickup, waypoint)| {
                let pairing = waypoint.pairing.as_deref()?;
                let delivery = self.waypoints.iter().position(|candidate| {
                    candidate.role == WaypointRole::Delivery && candidate.pairing.as_deref() == Some(pairing)
                })?;
                let quantity = waypoint.demand.map_or(1, |demand| demand.abs().round() as i64);
                Some(PickupDeliveryPair {
                    pickup,
                    delivery,
                    quantity,
                })
            })
            .collect()
    }

    pub fn coordinates(&self) -> Vec<Option<Coordinates>> {
        self.waypoints.iter().map(|waypoint| waypoint.location).collect()
    }
}

fn per_waypoint(waypoints: &[Waypoint], field: impl Fn(&Waypoint) -> Option<f64>) -> Option<Vec<f64>> {
    waypoints
        .iter()
        .any(|waypoint| field(waypoint).is_some())
        .then(|| waypoints.iter().map(|waypoint| field(waypoint).unwrap_or(0.0)).collect())
}
