//! Capability documents: which solvers exist, which VRP variants each one
//! supports, and what data each variant needs.
//!
//! The discovery endpoint has shipped several wire shapes over time
//! (solver lists vs. name-keyed maps, a terse `vrp_types` listing vs. a
//! richer `specs` table). All of them are folded into one canonical
//! [`CapabilityDocument`] here so nothing downstream branches on shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CompileError, TokenParseError};
use crate::token::DataToken;

/// Required and optional data tokens for one (solver, variant) pair.
///
/// Both lists are ordered sets: declaration order is kept, duplicates dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariantSpec {
    pub required: Vec<DataToken>,
    pub optional: Vec<DataToken>,
}

impl VariantSpec {
    pub fn new(required: Vec<DataToken>, optional: Vec<DataToken>) -> Self {
        Self {
            required: dedupe(required),
            optional: dedupe(optional),
        }
    }

    /// Parses token strings; convenient for fixtures and hand-built specs.
    pub fn parse(required: &[&str], optional: &[&str]) -> Result<Self, TokenParseError> {
        let parse_all = |raw: &[&str]| raw.iter().map(|token| token.parse()).collect::<Result<Vec<_>, _>>();
        Ok(Self::new(parse_all(required)?, parse_all(optional)?))
    }

    /// Required tokens followed by optional ones, in declared order.
    pub fn tokens(&self) -> impl Iterator<Item = &DataToken> {
        self.required.iter().chain(self.optional.iter())
    }
}

fn dedupe(tokens: Vec<DataToken>) -> Vec<DataToken> {
    let mut unique: Vec<DataToken> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !unique.contains(&token) {
            unique.push(token);
        }
    }
    unique
}

/// A variant name, with its spec when the document carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantEntry {
    pub name: String,
    pub spec: Option<VariantSpec>,
}

/// Everything the document says about one solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverCapabilities {
    pub name: String,
    pub variants: Vec<VariantEntry>,
}

impl SolverCapabilities {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, spec: VariantSpec) -> Self {
        self.upsert(name.into(), Some(spec));
        self
    }

    pub fn variant(&self, name: &str) -> Option<&VariantEntry> {
        self.variants
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    /// A spec replaces an existing entry; a bare name never erases one.
    fn upsert(&mut self, name: String, spec: Option<VariantSpec>) {
        match self
            .variants
            .iter_mut()
            .find(|entry| entry.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => {
                if spec.is_some() {
                    existing.spec = spec;
                }
            }
            None => self.variants.push(VariantEntry { name, spec }),
        }
    }
}

/// An external data source and the tokens it can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterDescriptor {
    pub name: String,
    pub provides: Vec<DataToken>,
}

impl AdapterDescriptor {
    pub fn provides(&self, token: &DataToken) -> bool {
        self.provides.contains(token)
    }
}

/// Canonical, read-only view of the capabilities-discovery response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityDocument {
    solvers: Vec<SolverCapabilities>,
    adapters: Vec<AdapterDescriptor>,
}

impl CapabilityDocument {
    pub fn new(solvers: Vec<SolverCapabilities>, adapters: Vec<AdapterDescriptor>) -> Self {
        Self { solvers, adapters }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CompileError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Accepts a full document object, or a bare solver list.
    pub fn from_value(value: Value) -> Result<Self, CompileError> {
        let wire: DocumentWire = match value {
            Value::Array(_) => DocumentWire {
                solvers: Some(serde_json::from_value(value)?),
                specs: None,
                adapters: None,
            },
            other => serde_json::from_value(other)?,
        };
        Ok(wire.into_document())
    }

    pub fn solvers(&self) -> &[SolverCapabilities] {
        &self.solvers
    }

    pub fn adapters(&self) -> &[AdapterDescriptor] {
        &self.adapters
    }

    pub fn solver(&self, name: &str) -> Option<&SolverCapabilities> {
        self.solvers
            .iter()
            .find(|solver| solver.name.eq_ignore_ascii_case(name))
    }

    pub fn solver_names(&self) -> impl Iterator<Item = &str> {
        self.solvers.iter().map(|solver| solver.name.as_str())
    }

    /// Variant names declared for a solver, including ones without a spec.
    pub fn variants_for(&self, solver: &str) -> Vec<&str> {
        self.solver(solver)
            .map(|solver| solver.variants.iter().map(|entry| entry.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn variant_spec(&self, solver: &str, variant: &str) -> Option<&VariantSpec> {
        self.solver(solver)?.variant(variant)?.spec.as_ref()
    }

    pub fn adapter(&self, name: &str) -> Option<&AdapterDescriptor> {
        self.adapters
            .iter()
            .find(|adapter| adapter.name.eq_ignore_ascii_case(name))
    }

    pub fn adapters_providing<'a>(&'a self, token: &DataToken) -> impl Iterator<Item = &'a AdapterDescriptor> + use<'a> {
        let token = token.clone();
        self.adapters.iter().filter(move |adapter| adapter.provides(&token))
    }

    fn solver_mut(&mut self, name: &str) -> &mut SolverCapabilities {
        let position = self
            .solvers
            .iter()
            .position(|solver| solver.name.eq_ignore_ascii_case(name));
        let index = position.unwrap_or_else(|| {
            self.solvers.push(SolverCapabilities::new(name));
            self.solvers.len() - 1
        });
        &mut self.solvers[index]
    }
}

/// Looks up the spec for a (solver, variant) pair, case-insensitively.
///
/// `None` means the combination is unsupported; it is not an error here.
pub fn get_variant_spec<'a>(
    doc: &'a CapabilityDocument,
    solver: &str,
    variant: &str,
) -> Option<&'a VariantSpec> {
    doc.variant_spec(solver, variant)
}

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Keyed<T> {
    List(Vec<T>),
    Map(BTreeMap<String, T>),
}

impl<T> Keyed<T> {
    /// Yields (map key, record) pairs; list records have no key.
    fn into_entries(self) -> Vec<(Option<String>, T)> {
        match self {
            Self::List(items) => items.into_iter().map(|item| (None, item)).collect(),
            Self::Map(items) => items.into_iter().map(|(key, item)| (Some(key), item)).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentWire {
    #[serde(default)]
    solvers: Option<Keyed<SolverWire>>,
    #[serde(default)]
    specs: Option<BTreeMap<String, Keyed<VariantWire>>>,
    #[serde(default)]
    adapters: Option<Keyed<AdapterWire>>,
}

#[derive(Debug, Deserialize)]
struct SolverWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "variants")]
    vrp_types: Option<Keyed<VariantWire>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariantWire {
    Spec(SpecWire),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct SpecWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    optional: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AdapterWire {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    provides: Vec<String>,
}

impl VariantWire {
    /// A variant whose tokens do not parse is kept by name only, so it
    /// resolves as unsupported without taking the rest of the document down.
    fn into_entry(self, solver: &str, key: Option<String>) -> Option<(String, Option<VariantSpec>)> {
        match self {
            Self::Name(name) => Some((key.unwrap_or(name), None)),
            Self::Spec(spec) => {
                let name = spec.name.or(key)?;
                let parsed = parse_tokens(&spec.required).and_then(|required| {
                    parse_tokens(&spec.optional).map(|optional| VariantSpec::new(required, optional))
                });
                match parsed {
                    Ok(parsed) => Some((name, Some(parsed))),
                    Err(err) => {
                        tracing::warn!(solver, variant = %name, %err, "dropping variant spec with a malformed token");
                        Some((name, None))
                    }
                }
            }
        }
    }
}

fn parse_tokens(raw: &[String]) -> Result<Vec<DataToken>, TokenParseError> {
    raw.iter().map(|token| token.parse()).collect()
}

impl DocumentWire {
    fn into_document(self) -> CapabilityDocument {
        let mut doc = CapabilityDocument::default();

        for (key, solver) in self.solvers.map(Keyed::into_entries).unwrap_or_default() {
            let Some(name) = solver.name.or(key) else {
                tracing::warn!("skipping unnamed solver record");
                continue;
            };
            let entry = doc.solver_mut(&name);
            for (variant_key, variant) in solver.vrp_types.map(Keyed::into_entries).unwrap_or_default() {
                if let Some((variant_name, spec)) = variant.into_entry(&name, variant_key) {
                    entry.upsert(variant_name, spec);
                }
            }
        }

        // The richer table wins over specs embedded in the solver list.
        for (solver_name, variants) in self.specs.unwrap_or_default() {
            let entry = doc.solver_mut(&solver_name);
            for (variant_key, variant) in variants.into_entries() {
                if let Some((variant_name, spec)) = variant.into_entry(&solver_name, variant_key) {
                    entry.upsert(variant_name, spec);
                }
            }
        }

        for (key, adapter) in self.adapters.map(Keyed::into_entries).unwrap_or_default() {
            let Some(name) = adapter.name.or(key) else {
                continue;
            };
            let provides = adapter
                .provides
                .iter()
                .filter_map(|raw| match raw.parse() {
                    Ok(token) => Some(token),
                    Err(err) => {
                        tracing::warn!(adapter = %name, %err, "ignoring malformed provided token");
                        None
                    }
                })
                .collect();
            doc.adapters.push(AdapterDescriptor { name, provides });
        }

        doc
    }
}
