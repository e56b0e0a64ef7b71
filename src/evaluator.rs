//! Requirement evaluation: which tokens a candidate payload satisfies.
//!
//! Evaluation is pure. It runs on the compiled payload, or on the raw
//! trip context (for readiness indicators before compiling).

use serde::Serialize;
use serde_json::Value;

use crate::assembler::candidate_payload;
use crate::capability::{AdapterDescriptor, CapabilityDocument, VariantSpec};
use crate::context::TripContext;
use crate::token::DataToken;

/// Whether one token is satisfied by a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenStatus {
    pub token: DataToken,
    pub satisfied: bool,
}

/// The accepted ways of naming which tokens to evaluate.
#[derive(Debug, Clone, Copy)]
pub enum RequirementSource<'a> {
    /// An explicit token list.
    Tokens(&'a [DataToken]),
    /// The required tokens of a spec.
    Spec(&'a VariantSpec),
    /// The required tokens of a spec looked up in a document.
    Lookup {
        doc: &'a CapabilityDocument,
        solver: &'a str,
        variant: &'a str,
    },
}

impl<'a> RequirementSource<'a> {
    /// Unknown (solver, variant) lookups yield no tokens.
    pub fn tokens(self) -> &'a [DataToken] {
        match self {
            Self::Tokens(tokens) => tokens,
            Self::Spec(spec) => &spec.required,
            Self::Lookup { doc, solver, variant } => doc
                .variant_spec(solver, variant)
                .map(|spec| spec.required.as_slice())
                .unwrap_or_default(),
        }
    }
}

impl<'a> From<&'a [DataToken]> for RequirementSource<'a> {
    fn from(tokens: &'a [DataToken]) -> Self {
        Self::Tokens(tokens)
    }
}

impl<'a> From<&'a VariantSpec> for RequirementSource<'a> {
    fn from(spec: &'a VariantSpec) -> Self {
        Self::Spec(spec)
    }
}

/// Reports, per token and in order, whether `payload` satisfies it.
pub fn evaluate(tokens: &[DataToken], payload: &Value) -> Vec<TokenStatus> {
    tokens
        .iter()
        .map(|token| TokenStatus {
            token: token.clone(),
            satisfied: is_satisfied(token, payload),
        })
        .collect()
}

pub fn evaluate_requirements<'a>(source: impl Into<RequirementSource<'a>>, payload: &Value) -> Vec<TokenStatus> {
    evaluate(source.into().tokens(), payload)
}

/// Required tokens of `spec` that `payload` does not satisfy.
pub fn missing_required(spec: &VariantSpec, payload: &Value) -> Vec<DataToken> {
    spec.required
        .iter()
        .filter(|token| !is_satisfied(token, payload))
        .cloned()
        .collect()
}

/// Readiness of a raw trip context, before any synthesis or repair.
pub fn evaluate_context(spec: &VariantSpec, ctx: &TripContext) -> Vec<TokenStatus> {
    evaluate(&spec.required, &candidate_payload(ctx))
}

/// Readiness of a context against its own (solver, variant).
///
/// Tokens the context's selected adapter provides count as satisfied, since
/// that adapter will supply them before compiling. `None` when the document
/// has no spec for the pair.
pub fn context_readiness(doc: &CapabilityDocument, ctx: &TripContext) -> Option<Vec<TokenStatus>> {
    let spec = doc.variant_spec(&ctx.solver, &ctx.variant)?;
    let mut statuses = evaluate_context(spec, ctx);

    if let Some(adapter) = ctx.adapter.as_deref().and_then(|name| doc.adapter(name)) {
        for status in statuses.iter_mut().filter(|status| !status.satisfied) {
            status.satisfied = adapter_covers(adapter, &status.token);
        }
    }
    Some(statuses)
}

fn adapter_covers(adapter: &AdapterDescriptor, token: &DataToken) -> bool {
    match token {
        DataToken::Or(left, right) => adapter_covers(adapter, left) || adapter_covers(adapter, right),
        other => adapter.provides(other),
    }
}

pub fn is_satisfied(token: &DataToken, payload: &Value) -> bool {
    match token {
        DataToken::Simple(name) => simple_satisfied(name, payload),
        DataToken::PathField(path) => match path.as_slice() {
            [root, sub] if root == "matrix" && (sub == "distances" || sub == "durations") => payload
                .get("matrix")
                .and_then(|matrix| matrix.get(sub))
                .is_some_and(Value::is_array),
            _ => resolve(payload, path.iter().map(String::as_str)).is_some_and(truthy),
        },
        DataToken::Threshold { field, op, value } => {
            let count = if field == "fleet" {
                fleet_len(payload)
            } else {
                cardinality(resolve(payload, field.split('.')))
            };
            op.holds(count, *value)
        }
        DataToken::Or(left, right) => is_satisfied(left, payload) || is_satisfied(right, payload),
    }
}

fn simple_satisfied(name: &str, payload: &Value) -> bool {
    let value = payload.get(name);
    match name {
        "matrix" => value.is_some_and(Value::is_object),
        "demands" | "node_service_times" => value.is_some_and(Value::is_array),
        "node_time_windows" => value.and_then(Value::as_array).is_some_and(|windows| {
            windows
                .iter()
                .find(|window| !window.is_null())
                .is_none_or(is_window)
        }),
        "depot_index" => value.is_some_and(|index| index.is_u64() || index.is_i64()),
        "pickup_delivery_pairs" => value
            .and_then(Value::as_array)
            .is_some_and(|pairs| !pairs.is_empty()),
        _ => value.is_some_and(truthy),
    }
}

/// A `[start, end]` pair, or the `{start, end}` object form.
fn is_window(value: &Value) -> bool {
    value.is_array() || value.as_object().is_some_and(|window| window.contains_key("start") || window.contains_key("end"))
}

fn fleet_len(payload: &Value) -> usize {
    match payload.get("fleet") {
        Some(Value::Array(vehicles)) => vehicles.len(),
        Some(Value::Object(fleet)) => fleet.get("vehicles").and_then(Value::as_array).map_or(0, Vec::len),
        _ => 0,
    }
}

fn cardinality(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(fields)) => fields.get("vehicles").and_then(Value::as_array).map_or(fields.len(), Vec::len),
        Some(Value::Number(number)) => number.as_u64().map_or(0, |n| n as usize),
        Some(other) => usize::from(truthy(other)),
        None => 0,
    }
}

/// Follows a dotted path through objects (and arrays, by index).
pub(crate) fn resolve<'a, 'p>(payload: &'a Value, path: impl IntoIterator<Item = &'p str>) -> Option<&'a Value> {
    path.into_iter().try_fold(payload, |current, segment| match current {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Non-empty containers and non-falsy scalars.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn satisfied(raw: &str, payload: Value) -> bool {
        is_satisfied(&raw.parse().expect("token"), &payload)
    }

    #[test]
    fn test_matrix_needs_object() {
        assert!(satisfied("matrix", json!({ "matrix": { "distances": [] } })));
        assert!(!satisfied("matrix", json!({ "matrix": [[0]] })));
        assert!(!satisfied("matrix", json!({})));
    }

    #[test]
    fn test_matrix_sub_arrays() {
        let payload = json!({ "matrix": { "distances": [[0, 1], [1, 0]] } });
        assert!(satisfied("matrix.distances", payload.clone()));
        assert!(!satisfied("matrix.durations", payload));
    }

    #[test]
    fn test_node_time_windows_need_pairs() {
        assert!(satisfied("node_time_windows", json!({ "node_time_windows": [[8, 17], [9, 12]] })));
        assert!(satisfied("node_time_windows", json!({ "node_time_windows": [] })));
        assert!(!satisfied("node_time_windows", json!({ "node_time_windows": [8, 17] })));
    }

    #[test]
    fn test_node_time_windows_skip_leading_nulls() {
        assert!(satisfied("node_time_windows", json!({ "node_time_windows": [null, [8, 17]] })));
        assert!(satisfied("node_time_windows", json!({ "node_time_windows": [null, null] })));
        assert!(!satisfied("node_time_windows", json!({ "node_time_windows": [null, 8] })));
    }

    #[test]
    fn test_per_node_vectors_need_arrays() {
        assert!(satisfied("demands", json!({ "demands": [0, 3, 4] })));
        assert!(satisfied("demands", json!({ "demands": [] })));
        assert!(!satisfied("demands", json!({ "demands": 7 })));
        assert!(!satisfied("demands", json!({ "demands": { "a": 1 } })));
        assert!(satisfied("node_service_times", json!({ "node_service_times": [0, 300] })));
        assert!(!satisfied("node_service_times", json!({ "node_service_times": 300 })));
        assert!(!satisfied("node_service_times", json!({})));
    }

    #[test]
    fn test_fleet_thresholds() {
        let nested = json!({ "fleet": { "vehicles": [{ "id": "a" }] } });
        let flat = json!({ "fleet": [{ "id": "a" }, { "id": "b" }] });
        assert!(satisfied("fleet>=1", nested.clone()));
        assert!(satisfied("fleet==1", nested));
        assert!(satisfied("fleet>=1", flat.clone()));
        assert!(!satisfied("fleet==1", flat));
        assert!(!satisfied("fleet>=1", json!({ "fleet": { "vehicles": [] } })));
    }

    #[test]
    fn test_depot_index_must_be_integer() {
        assert!(satisfied("depot_index", json!({ "depot_index": 0 })));
        assert!(!satisfied("depot_index", json!({ "depot_index": 0.5 })));
        assert!(!satisfied("depot_index", json!({ "depot_index": "0" })));
    }

    #[test]
    fn test_waypoints_or_matrix() {
        assert!(satisfied("waypoints|matrix", json!({ "waypoints": [{ "id": "a" }] })));
        assert!(satisfied("waypoints|matrix", json!({ "waypoints": [], "matrix": {} })));
        assert!(!satisfied("waypoints|matrix", json!({ "waypoints": [] })));
    }

    #[test]
    fn test_dotted_path_truthiness() {
        let payload = json!({ "options": { "max_time": 30, "explore": 0, "tags": [] } });
        assert!(satisfied("options.max_time", payload.clone()));
        assert!(!satisfied("options.explore", payload.clone()));
        assert!(!satisfied("options.tags", payload.clone()));
        assert!(!satisfied("options.missing", payload));
    }

    #[test]
    fn test_weights_and_pairs() {
        assert!(satisfied("weights", json!({ "weights": { "distance": 1, "time": 0 } })));
        assert!(!satisfied("weights", json!({ "weights": null })));
        assert!(!satisfied("pickup_delivery_pairs", json!({ "pickup_delivery_pairs": [] })));
    }
}
