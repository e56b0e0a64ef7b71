//! Capability document fixture.
//!
//! Mixes list-shaped and keyed solver records, a terse variant listing and
//! the richer `specs` table, the way the discovery endpoint serves them.

use vrp_request::CapabilityDocument;

pub const CAPABILITIES_JSON: &str = r#"
{
  "solvers": [
    {
      "name": "ortools",
      "vrp_types": {
        "cvrp": {
          "required": ["matrix.distances", "fleet>=1", "depot_index"],
          "optional": ["demands", "matrix.durations"]
        },
        "tsp": {
          "required": ["waypoints|matrix", "fleet==1", "depot_index"]
        },
        "pdp": {
          "required": ["matrix", "pickup_delivery_pairs", "fleet>=1", "depot_index"],
          "optional": ["demands", "node_service_times"]
        },
        "tuned": {
          "required": ["matrix", "fleet>=1"],
          "optional": ["weights", "search.time_limit"]
        }
      }
    },
    {
      "name": "vroom",
      "vrp_types": [
        {
          "name": "vrptw",
          "required": ["matrix.durations", "fleet>=1", "depot_index"],
          "optional": ["waypoints", "node_time_windows", "node_service_times", "demands"]
        }
      ]
    },
    { "name": "pyvrp", "vrp_types": ["cvrp", "vrptw"] }
  ],
  "specs": {
    "pyvrp": {
      "cvrp": {
        "required": ["matrix", "demands", "fleet>=1", "depot_index"],
        "optional": ["node_service_times"]
      }
    }
  },
  "adapters": [
    { "name": "osrm", "provides": ["matrix.distances", "matrix.durations"] },
    { "name": "euclidean", "provides": ["matrix"] }
  ]
}
"#;

pub fn document() -> CapabilityDocument {
    CapabilityDocument::from_json_str(CAPABILITIES_JSON).expect("fixture document parses")
}

/// Every (solver, variant) pair in the fixture that has a spec.
pub fn supported_pairs() -> Vec<(String, String)> {
    let doc = document();
    doc.solvers()
        .iter()
        .flat_map(|solver| {
            solver
                .variants
                .iter()
                .filter(|variant| variant.spec.is_some())
                .map(|variant| (solver.name.clone(), variant.name.clone()))
        })
        .collect()
}
