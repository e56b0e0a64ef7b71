//! Payload assembly: turns a trip context into a solver-ready request.
//!
//! The assembler walks the variant's required tokens and then its optional
//! ones, selecting the payload fields they name. Selected data is then
//! materialized (matrix synthesized or repaired, fleet synthesized,
//! service times normalized), emitted, and finally checked against the
//! required tokens with the same evaluator callers use.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::capability::CapabilityDocument;
use crate::context::{TimeWindow, TripContext, Vehicle, Waypoint};
use crate::diagnostics::{Correction, Diagnostics, MatrixSource};
use crate::error::CompileError;
use crate::evaluator::{missing_required, resolve};
use crate::haversine::HaversineMatrix;
use crate::matrix::Matrix;
use crate::options::{CompileOptions, ServiceTimePolicy};
use crate::planar::{euclidean_distances, is_planar, planar_points};
use crate::repair::repair_matrix;
use crate::service_time::normalize_service_times;
use crate::token::{Comparison, DataToken};
use crate::traits::MatrixProvider;

/// Request body for a solve endpoint.
///
/// Always a JSON object holding `solver` plus only the fields the
/// variant's tokens refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RequestPayload(Value);

impl RequestPayload {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.get(field).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0
            .as_object()
            .into_iter()
            .flat_map(Map::keys)
            .map(String::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// A payload together with the corrections made while building it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledRequest {
    pub payload: RequestPayload,
    pub diagnostics: Diagnostics,
}

/// Builds a request with the default [`CompileOptions`].
pub fn build_payload(doc: &CapabilityDocument, ctx: &TripContext) -> Result<CompiledRequest, CompileError> {
    build_payload_with(doc, ctx, &CompileOptions::default())
}

pub fn build_payload_with(
    doc: &CapabilityDocument,
    ctx: &TripContext,
    options: &CompileOptions,
) -> Result<CompiledRequest, CompileError> {
    let span = tracing::info_span!("build_payload", solver = %ctx.solver, variant = %ctx.variant);
    let _guard = span.enter();
    options.validate()?;

    let spec = doc
        .variant_spec(&ctx.solver, &ctx.variant)
        .ok_or_else(|| CompileError::UnsupportedCombination {
            solver: ctx.solver.clone(),
            variant: ctx.variant.clone(),
        })?;

    if !ctx.waypoints.is_empty() && ctx.depot_index >= ctx.waypoints.len() {
        return Err(CompileError::InvalidDepot {
            index: ctx.depot_index,
            len: ctx.waypoints.len(),
        });
    }

    let mut selection = Selection::default();
    for token in spec.tokens() {
        let selected = selection.select(token, ctx);
        tracing::debug!(%token, selected, "walked token");
    }

    let mut diagnostics = Diagnostics::default();
    let data = Materialized::new(ctx, &selection, options, &mut diagnostics)?;

    let mut payload = Map::new();
    payload.insert("solver".to_string(), json!(ctx.solver));
    for field in &selection.fields {
        if let Some(value) = data.emit(field, ctx) {
            insert_field(&mut payload, field, value);
        }
    }

    if is_vroom(&ctx.solver) {
        coerce_time_windows(&mut payload, &mut diagnostics);
    }

    let payload = RequestPayload(Value::Object(payload));
    let missing = missing_required(spec, payload.as_value());
    if !missing.is_empty() {
        return Err(CompileError::InsufficientData { missing });
    }

    Ok(CompiledRequest { payload, diagnostics })
}

/// The context's data as-is, shaped like a payload, for readiness checks.
pub(crate) fn candidate_payload(ctx: &TripContext) -> Value {
    let mut payload = ctx.extras.clone();
    payload.insert("solver".to_string(), json!(ctx.solver));
    payload.insert("depot_index".to_string(), json!(ctx.depot_index));
    if !ctx.waypoints.is_empty() {
        payload.insert(
            "waypoints".to_string(),
            waypoints_value(&ctx.waypoints, ctx.service_times().as_deref()),
        );
    }
    if !ctx.fleet.is_empty() {
        payload.insert("fleet".to_string(), fleet_value(&ctx.fleet, ctx.depot_index));
    }
    if let Some(matrix) = &ctx.matrix {
        payload.insert("matrix".to_string(), json!(matrix));
    }
    if let Some(demands) = ctx.demands() {
        payload.insert("demands".to_string(), json!(demands));
    }
    if let Some(service) = ctx.service_times() {
        payload.insert("node_service_times".to_string(), json!(service));
    }
    if let Some(windows) = ctx.time_windows() {
        payload.insert("node_time_windows".to_string(), windows_value(&windows));
    }
    let pairs = ctx.pickup_delivery_pairs();
    if !pairs.is_empty() {
        payload.insert("pickup_delivery_pairs".to_string(), json!(pairs));
    }
    if let Some(weights) = ctx.weights {
        payload.insert("weights".to_string(), json!(weights));
    }
    Value::Object(payload)
}

/// VROOM-class solvers take `{start, end}` objects instead of pairs.
fn is_vroom(solver: &str) -> bool {
    solver.to_ascii_lowercase().contains("vroom")
}

// ============================================================================
// Token walk
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Waypoints,
    Matrix,
    Demands,
    ServiceTimes,
    TimeWindows,
    DepotIndex,
    PickupDeliveryPairs,
    Weights,
    Fleet { synthesize: bool, exactly_one: bool },
    Extra(Vec<String>),
}

#[derive(Debug, Default)]
struct Selection {
    fields: Vec<Field>,
}

impl Selection {
    fn has(&self, wanted: &Field) -> bool {
        self.fields.iter().any(|field| match (field, wanted) {
            (Field::Fleet { .. }, Field::Fleet { .. }) => true,
            _ => field == wanted,
        })
    }

    fn push(&mut self, field: Field) {
        if let Field::Fleet {
            synthesize,
            exactly_one,
        } = field
        {
            if let Some(Field::Fleet {
                synthesize: existing_synthesize,
                exactly_one: existing_exactly_one,
            }) = self
                .fields
                .iter_mut()
                .find(|existing| matches!(existing, Field::Fleet { .. }))
            {
                *existing_synthesize |= synthesize;
                *existing_exactly_one |= exactly_one;
                return;
            }
        }
        if !self.has(&field) {
            self.fields.push(field);
        }
    }

    /// Selects the field(s) `token` names; `false` when the data is absent.
    fn select(&mut self, token: &DataToken, ctx: &TripContext) -> bool {
        match token {
            DataToken::Simple(name) => self.select_field(simple_field(name, ctx)),
            DataToken::PathField(_) if token.references_matrix() => {
                self.push(Field::Matrix);
                true
            }
            DataToken::PathField(path) => self.select_field(path_field(path, ctx)),
            DataToken::Threshold { field, op, value } if field == "fleet" => {
                self.push(Field::Fleet {
                    synthesize: true,
                    exactly_one: *op == Comparison::Exactly && *value == 1,
                });
                true
            }
            DataToken::Threshold { field, .. } if field.contains('.') => {
                let path: Vec<String> = field.split('.').map(str::to_string).collect();
                self.select_field(path_field(&path, ctx))
            }
            DataToken::Threshold { field, .. } => self.select_field(simple_field(field, ctx)),
            DataToken::Or(left, right) => self.select_alternative(left, ctx) || self.select_alternative(right, ctx),
        }
    }

    /// Inside an alternative a matrix only counts when one was supplied.
    fn select_alternative(&mut self, token: &DataToken, ctx: &TripContext) -> bool {
        if token.references_matrix() && !matches!(token, DataToken::Or(..)) {
            if ctx.matrix.is_none() {
                return false;
            }
            self.push(Field::Matrix);
            return true;
        }
        self.select(token, ctx)
    }

    fn select_field(&mut self, field: Option<Field>) -> bool {
        match field {
            Some(field) => {
                self.push(field);
                true
            }
            None => false,
        }
    }
}

/// The field a bare token name refers to, when the context has its data.
fn simple_field(name: &str, ctx: &TripContext) -> Option<Field> {
    let field = match name {
        "matrix" => Field::Matrix,
        "waypoints" => (!ctx.waypoints.is_empty()).then_some(Field::Waypoints)?,
        "demands" => ctx.demands().map(|_| Field::Demands)?,
        "node_service_times" => ctx.service_times().map(|_| Field::ServiceTimes)?,
        "node_time_windows" => ctx.time_windows().map(|_| Field::TimeWindows)?,
        "depot_index" => Field::DepotIndex,
        "pickup_delivery_pairs" => (!ctx.pickup_delivery_pairs().is_empty()).then_some(Field::PickupDeliveryPairs)?,
        "weights" => ctx.weights.map(|_| Field::Weights)?,
        "fleet" => Field::Fleet {
            synthesize: false,
            exactly_one: false,
        },
        other => extra_field(vec![other.to_string()], ctx)?,
    };
    Some(field)
}

/// Payload fields built from the context rather than copied from extras.
const BUILT_FIELDS: [&str; 9] = [
    "matrix",
    "waypoints",
    "demands",
    "node_service_times",
    "node_time_windows",
    "depot_index",
    "pickup_delivery_pairs",
    "weights",
    "fleet",
];

/// A dotted token selects its whole root field when that field is built
/// here, so the evaluator can then walk into it. Other roots read extras.
fn path_field(path: &[String], ctx: &TripContext) -> Option<Field> {
    let root = path.first()?;
    if BUILT_FIELDS.contains(&root.as_str()) {
        simple_field(root, ctx)
    } else {
        extra_field(path.to_vec(), ctx)
    }
}

fn extra_field(path: Vec<String>, ctx: &TripContext) -> Option<Field> {
    extra_present(ctx, &path).then_some(Field::Extra(path))
}

fn extra_present(ctx: &TripContext, path: &[String]) -> bool {
    extra_value(ctx, path).is_some_and(|value| !value.is_null())
}

fn extra_value<'a>(ctx: &'a TripContext, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let root = ctx.extras.get(first)?;
    resolve(root, rest.iter().map(String::as_str))
}

// ============================================================================
// Materialization
// ============================================================================

struct Materialized {
    matrix: Option<Matrix>,
    service: Option<Vec<f64>>,
    fleet: Vec<Vehicle>,
}

impl Materialized {
    fn new(
        ctx: &TripContext,
        selection: &Selection,
        options: &CompileOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, CompileError> {
        let planar = is_planar(&ctx.waypoints, options.planar_supermajority);

        let matrix = if selection.has(&Field::Matrix) {
            prepare_matrix(ctx, planar, options, diagnostics)?
        } else {
            None
        };

        let mut service = ctx.service_times();
        let run_heuristics = match options.service_time_policy {
            ServiceTimePolicy::Always => true,
            ServiceTimePolicy::Auto => planar,
            ServiceTimePolicy::Never => false,
        };
        if run_heuristics {
            if let (Some(times), Some(matrix)) = (service.as_mut(), matrix.as_ref()) {
                if let Some(correction) = normalize_service_times(times, matrix, options) {
                    diagnostics.record(correction);
                }
            } else {
                tracing::debug!("service-time heuristics skipped: no service times or matrix");
            }
        }

        let fleet = selection
            .fields
            .iter()
            .find_map(|field| match field {
                Field::Fleet {
                    synthesize,
                    exactly_one,
                } => Some(prepare_fleet(ctx, *synthesize, *exactly_one, diagnostics)),
                _ => None,
            })
            .unwrap_or_default();

        Ok(Self { matrix, service, fleet })
    }

    fn emit(&self, field: &Field, ctx: &TripContext) -> Option<Value> {
        match field {
            Field::Waypoints => Some(waypoints_value(&ctx.waypoints, self.service.as_deref())),
            Field::Matrix => self.matrix.as_ref().map(|matrix| json!(matrix)),
            Field::Demands => ctx.demands().map(|demands| json!(demands)),
            Field::ServiceTimes => self.service.as_ref().map(|service| json!(service)),
            Field::TimeWindows => ctx.time_windows().map(|windows| windows_value(&windows)),
            Field::DepotIndex => Some(json!(ctx.depot_index)),
            Field::PickupDeliveryPairs => Some(json!(ctx.pickup_delivery_pairs())),
            Field::Weights => ctx.weights.map(|weights| json!(weights)),
            Field::Fleet { .. } => (!self.fleet.is_empty()).then(|| fleet_value(&self.fleet, ctx.depot_index)),
            Field::Extra(path) => extra_value(ctx, path).cloned(),
        }
    }
}

/// Every matrix, supplied or synthesized, goes through unit repair.
fn prepare_matrix(
    ctx: &TripContext,
    planar: bool,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Matrix>, CompileError> {
    let coordinates = ctx.coordinates();
    let outcome = match &ctx.matrix {
        Some(supplied) => repair_matrix(supplied, &coordinates, options)?,
        None => match synthesize_matrix(ctx, planar, options, diagnostics) {
            Some(built) => repair_matrix(&built, &coordinates, options)?,
            None => return Ok(None),
        },
    };
    diagnostics.extend(outcome.corrections);
    Ok(Some(outcome.matrix))
}

/// Planar distances, or a great-circle matrix when that fallback is enabled.
///
/// Planar durations are left to repair so they follow any unit rescale.
fn synthesize_matrix(
    ctx: &TripContext,
    planar: bool,
    options: &CompileOptions,
    diagnostics: &mut Diagnostics,
) -> Option<Matrix> {
    if ctx.waypoints.is_empty() {
        return None;
    }

    if planar {
        let Some(points) = planar_points(&ctx.waypoints) else {
            tracing::warn!("planar dataset has waypoints without any position; no matrix synthesized");
            return None;
        };
        diagnostics.record(Correction::MatrixSynthesized {
            source: MatrixSource::Planar,
        });
        return Some(Matrix::new(euclidean_distances(&points)));
    }

    if !options.synthesize_geodesic_matrix {
        return None;
    }
    let locations = ctx.coordinates().into_iter().collect::<Option<Vec<_>>>()?;
    match HaversineMatrix::new(options.nominal_speed_kph).matrix_for(&locations) {
        Ok(matrix) => {
            diagnostics.record(Correction::MatrixSynthesized {
                source: MatrixSource::Geodesic,
            });
            Some(matrix)
        }
        Err(err) => {
            tracing::warn!(%err, "geodesic matrix synthesis failed");
            None
        }
    }
}

/// One default vehicle when none is given, sized to the total demand.
fn prepare_fleet(ctx: &TripContext, synthesize: bool, exactly_one: bool, diagnostics: &mut Diagnostics) -> Vec<Vehicle> {
    let mut fleet = ctx.fleet.clone();

    if fleet.is_empty() && synthesize {
        let capacity = ctx.total_non_depot_demand().max(1.0);
        fleet.push(Vehicle::new("vehicle-1", vec![capacity]).between(ctx.depot_index, ctx.depot_index));
        diagnostics.record(Correction::FleetSynthesized { capacity });
    }

    if exactly_one && fleet.len() > 1 {
        let dropped = fleet.len() - 1;
        fleet.truncate(1);
        diagnostics.record(Correction::FleetTruncated { dropped });
    }

    fleet
}

// ============================================================================
// Emission
// ============================================================================

fn insert_field(payload: &mut Map<String, Value>, field: &Field, value: Value) {
    let path: Vec<String> = match field {
        Field::Waypoints => vec!["waypoints".to_string()],
        Field::Matrix => vec!["matrix".to_string()],
        Field::Demands => vec!["demands".to_string()],
        Field::ServiceTimes => vec!["node_service_times".to_string()],
        Field::TimeWindows => vec!["node_time_windows".to_string()],
        Field::DepotIndex => vec!["depot_index".to_string()],
        Field::PickupDeliveryPairs => vec!["pickup_delivery_pairs".to_string()],
        Field::Weights => vec!["weights".to_string()],
        Field::Fleet { .. } => vec!["fleet".to_string()],
        Field::Extra(path) => path.clone(),
    };
    insert_path(payload, &path, value);
}

/// Inserts `value` at a dotted path, creating intermediate objects.
fn insert_path(payload: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = payload;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.clone(), value);
}

fn window_pair(window: &TimeWindow) -> Value {
    json!([window.start(), window.end()])
}

fn windows_value(windows: &[TimeWindow]) -> Value {
    Value::Array(windows.iter().map(window_pair).collect())
}

fn waypoints_value(waypoints: &[Waypoint], service: Option<&[f64]>) -> Value {
    Value::Array(
        waypoints
            .iter()
            .enumerate()
            .map(|(index, waypoint)| {
                let mut entry = Map::new();
                entry.insert("id".to_string(), json!(waypoint.id));
                if let Some(location) = waypoint.location {
                    entry.insert("location".to_string(), json!({ "lat": location.lat, "lon": location.lon }));
                }
                if let Some(demand) = waypoint.demand {
                    entry.insert("demand".to_string(), json!(demand));
                }
                let seconds = waypoint
                    .service
                    .and(service.and_then(|times| times.get(index).copied()));
                if let Some(seconds) = seconds {
                    entry.insert("service".to_string(), json!(seconds));
                }
                if let Some(window) = &waypoint.time_window {
                    entry.insert("time_window".to_string(), window_pair(window));
                }
                Value::Object(entry)
            })
            .collect(),
    )
}

fn fleet_value(vehicles: &[Vehicle], depot_index: usize) -> Value {
    let vehicles: Vec<Value> = vehicles
        .iter()
        .map(|vehicle| {
            let mut entry = Map::new();
            entry.insert("id".to_string(), json!(vehicle.id));
            entry.insert("capacity".to_string(), json!(vehicle.capacity));
            entry.insert("start".to_string(), json!(vehicle.start.unwrap_or(depot_index)));
            entry.insert("end".to_string(), json!(vehicle.end.unwrap_or(depot_index)));
            if let Some((start, end)) = vehicle.time_window {
                entry.insert("time_window".to_string(), json!([start, end]));
            }
            Value::Object(entry)
        })
        .collect();
    json!({ "vehicles": vehicles })
}

// ============================================================================
// VROOM time-window shape
// ============================================================================

/// Rewrites `[start, end]` pairs as `{start, end}`; fully open windows
/// become `null`, and a node window array that is all `null` is dropped.
fn coerce_time_windows(payload: &mut Map<String, Value>, diagnostics: &mut Diagnostics) {
    if let Some(Value::Array(windows)) = payload.get_mut("node_time_windows") {
        for window in windows.iter_mut() {
            *window = window_object(window);
        }
        if windows.iter().all(Value::is_null) {
            payload.remove("node_time_windows");
            diagnostics.record(Correction::EmptyTimeWindowsDropped);
        }
    }

    if let Some(Value::Array(waypoints)) = payload.get_mut("waypoints") {
        for waypoint in waypoints.iter_mut().filter_map(Value::as_object_mut) {
            if let Some(window) = waypoint.get("time_window").map(window_object) {
                if window.is_null() {
                    waypoint.remove("time_window");
                } else {
                    waypoint.insert("time_window".to_string(), window);
                }
            }
        }
    }
}

fn window_object(window: &Value) -> Value {
    match window.as_array().map(Vec::as_slice) {
        Some([start, end]) if start.is_null() && end.is_null() => Value::Null,
        Some([start, end]) => json!({ "start": start, "end": end }),
        _ => window.clone(),
    }
}
