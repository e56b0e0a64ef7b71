//! Requirement evaluator tests
//!
//! Covers the three call shapes, readiness checks on raw contexts, and the
//! guarantee that every compiled payload satisfies its own variant.

mod fixtures;

use serde_json::json;

use vrp_request::evaluator::{context_readiness, evaluate_context, missing_required};
use vrp_request::{
    CapabilityDocument, DataToken, Matrix, RequirementSource, TripContext, build_payload, evaluate,
    evaluate_requirements,
};

use fixtures::{STOPS, WYNN, document, supported_pairs};

// ============================================================================
// Helpers
// ============================================================================

/// A geographic context carrying every kind of data a variant can ask for.
fn rich_context(solver: &str, variant: &str) -> TripContext {
    TripContext::new(solver, variant)
        .depot(0)
        .waypoint(WYNN.waypoint().depot().demand(0.0))
        .waypoint(STOPS[0].waypoint().pickup("order-1").demand(2.0).service(300.0))
        .waypoint(STOPS[1].waypoint().delivery("order-1").demand(-2.0).service(300.0))
        .waypoint(STOPS[2].waypoint().demand(3.0).window(32_400.0, 39_600.0))
        .matrix(Matrix::new(vec![
            vec![0.0, 2_480.0, 1_150.0, 1_020.0],
            vec![2_470.0, 0.0, 3_610.0, 1_560.0],
            vec![1_160.0, 3_600.0, 0.0, 2_080.0],
            vec![1_010.0, 1_570.0, 2_090.0, 0.0],
        ]))
        .weights(1.0, 0.5)
        .extra("search", json!({ "time_limit": 10 }))
}

fn tokens(raw: &[&str]) -> Vec<DataToken> {
    raw.iter().map(|token| token.parse().expect("token")).collect()
}

// ============================================================================
// Call shapes
// ============================================================================

#[test]
fn test_call_shapes_agree() {
    let doc = document();
    let spec = doc.variant_spec("ortools", "cvrp").expect("spec");
    let payload = json!({
        "matrix": { "distances": [[0, 1], [1, 0]] },
        "depot_index": 0
    });

    let from_tokens = evaluate_requirements(spec.required.as_slice(), &payload);
    let from_spec = evaluate_requirements(spec, &payload);
    let from_lookup = evaluate_requirements(
        RequirementSource::Lookup {
            doc: &doc,
            solver: "ORTools",
            variant: "CVRP",
        },
        &payload,
    );

    assert_eq!(from_tokens, from_spec);
    assert_eq!(from_spec, from_lookup);
    let satisfied: Vec<(String, bool)> = from_spec
        .iter()
        .map(|status| (status.token.to_string(), status.satisfied))
        .collect();
    assert_eq!(
        satisfied,
        vec![
            ("matrix.distances".to_string(), true),
            ("fleet>=1".to_string(), false),
            ("depot_index".to_string(), true),
        ]
    );
}

#[test]
fn test_unknown_lookup_yields_no_statuses() {
    let doc = document();
    let statuses = evaluate_requirements(
        RequirementSource::Lookup {
            doc: &doc,
            solver: "gurobi",
            variant: "cvrp",
        },
        &json!({}),
    );
    assert!(statuses.is_empty());
}

#[test]
fn test_statuses_follow_token_order() {
    let required = tokens(&["depot_index", "demands", "waypoints|matrix"]);
    let statuses = evaluate(&required, &json!({ "demands": [0, 1], "matrix": {} }));

    let order: Vec<&DataToken> = statuses.iter().map(|status| &status.token).collect();
    assert_eq!(order, required.iter().collect::<Vec<_>>());
    assert_eq!(
        statuses.iter().map(|status| status.satisfied).collect::<Vec<_>>(),
        vec![false, true, true]
    );
}

// ============================================================================
// Shape rules
// ============================================================================

#[test]
fn test_flat_time_window_pair_is_not_per_node() {
    let required = tokens(&["node_time_windows"]);

    let flat = evaluate(&required, &json!({ "node_time_windows": [8, 17] }));
    let nested = evaluate(&required, &json!({ "node_time_windows": [[8, 17]] }));
    let objects = evaluate(&required, &json!({ "node_time_windows": [null, { "start": 8, "end": 17 }] }));

    assert!(!flat[0].satisfied);
    assert!(nested[0].satisfied);
    assert!(objects[0].satisfied);
}

#[test]
fn test_matrix_as_nested_array_is_not_an_object() {
    let required = tokens(&["matrix", "matrix.distances"]);
    let statuses = evaluate(&required, &json!({ "matrix": [[0, 1], [1, 0]] }));
    assert!(statuses.iter().all(|status| !status.satisfied));
}

#[test]
fn test_missing_required_ignores_optional_tokens() {
    let doc = document();
    let spec = doc.variant_spec("vroom", "vrptw").expect("spec");
    let payload = json!({
        "matrix": { "distances": [[0]], "durations": [[0]] },
        "fleet": { "vehicles": [{ "id": "v" }] },
        "depot_index": 0
    });
    assert!(missing_required(spec, &payload).is_empty());
}

// ============================================================================
// Readiness
// ============================================================================

#[test]
fn test_context_readiness_before_synthesis() {
    let doc = document();
    let spec = doc.variant_spec("pyvrp", "cvrp").expect("spec");
    let ctx = rich_context("pyvrp", "cvrp");

    let readiness = evaluate_context(spec, &ctx);
    let unmet: Vec<String> = readiness
        .iter()
        .filter(|status| !status.satisfied)
        .map(|status| status.token.to_string())
        .collect();
    assert_eq!(unmet, vec!["fleet>=1"], "fleet is only synthesized at build time");

    let compiled = build_payload(&doc, &ctx).expect("payload");
    assert!(
        evaluate(&spec.required, compiled.payload.as_value())
            .iter()
            .all(|status| status.satisfied)
    );
}

#[test]
fn test_context_without_demands_is_not_ready() {
    let doc = document();
    let spec = doc.variant_spec("pyvrp", "cvrp").expect("spec");
    let ctx = TripContext::new("pyvrp", "cvrp").waypoint(WYNN.waypoint());

    let readiness = evaluate_context(spec, &ctx);
    let demands = readiness
        .iter()
        .find(|status| status.token.is_simple("demands"))
        .expect("demands status");
    assert!(!demands.satisfied);
}

#[test]
fn test_selected_adapter_counts_as_ready() {
    let doc = document();
    let ctx = TripContext::new("pyvrp", "cvrp")
        .waypoint(WYNN.waypoint().depot())
        .waypoint(STOPS[0].waypoint().demand(2.0));

    let unmet = |statuses: Vec<vrp_request::TokenStatus>| -> Vec<String> {
        statuses
            .into_iter()
            .filter(|status| !status.satisfied)
            .map(|status| status.token.to_string())
            .collect()
    };

    let without = context_readiness(&doc, &ctx).expect("spec");
    assert_eq!(unmet(without), vec!["matrix", "fleet>=1"]);

    let with = context_readiness(&doc, &ctx.clone().adapter("euclidean")).expect("spec");
    assert_eq!(unmet(with), vec!["fleet>=1"]);

    assert!(context_readiness(&doc, &TripContext::new("pyvrp", "vrptw")).is_none());
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_every_supported_variant_satisfies_its_own_requirements() {
    let doc = document();
    let pairs = supported_pairs();
    assert_eq!(pairs.len(), 6, "fixture pairs: {pairs:?}");

    for (solver, variant) in pairs {
        let ctx = rich_context(&solver, &variant);
        let compiled = build_payload(&doc, &ctx).unwrap_or_else(|err| panic!("{solver}/{variant}: {err}"));
        let spec = doc.variant_spec(&solver, &variant).expect("spec");

        for status in evaluate(&spec.required, compiled.payload.as_value()) {
            assert!(status.satisfied, "{solver}/{variant}: {} unmet", status.token);
        }
        assert_eq!(compiled.payload.get("solver"), Some(&json!(solver)));
    }
}

#[test]
fn test_dotted_tokens_into_built_fields_round_trip() {
    let doc = CapabilityDocument::from_value(json!({
        "solvers": { "custom": { "vrp_types": {
            "weighted": {
                "required": ["matrix.durations", "weights.distance", "fleet>=1", "depot_index"],
                "optional": ["search.time_limit"]
            },
            "indexed": {
                "required": ["waypoints.0.location", "demands>=4", "fleet>=1", "fleet.vehicles", "matrix"]
            }
        } } }
    }))
    .expect("document");

    for variant in ["weighted", "indexed"] {
        let ctx = rich_context("custom", variant);
        let compiled = build_payload(&doc, &ctx).unwrap_or_else(|err| panic!("{variant}: {err}"));
        let spec = doc.variant_spec("custom", variant).expect("spec");

        for status in evaluate(&spec.required, compiled.payload.as_value()) {
            assert!(status.satisfied, "{variant}: {} unmet", status.token);
        }
    }
}
