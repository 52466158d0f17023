//! Schema registry: node-kind hierarchy and edge-kind connection rules
//!
//! A [`Schema`] is loaded once from a declarative JSON table and is immutable
//! afterwards. Edge kinds declared with a `reverse` block register both
//! directions; the reverse entry has source and target sets swapped. Node
//! kinds form a single-inheritance hierarchy rooted at [`ROOT_NODE_KIND`], and
//! an allowed-connection entry naming a family admits every descendant.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Implicit root of the node-kind hierarchy; admits every kind
pub const ROOT_NODE_KIND: &str = "Node";

const BUILTIN_SCHEMA: &str = include_str!("../schema/connections.json");

/// A node kind declared by the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeKindDef {
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Directionality of an edge kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum EdgeDirection {
    /// Same meaning in both directions
    Symmetric,
    /// Declared direction, with the name of its reverse
    Canonical { reverse: String },
    /// Generated reverse of a canonical kind
    Reverse { canonical: String },
}

/// An edge kind and the node kinds it may connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeKindDef {
    pub name: String,
    pub label: String,
    pub description: String,
    /// External ontology mapping, kept for export fidelity
    pub mapping: HashMap<String, serde_json::Value>,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
    #[serde(flatten)]
    pub direction: EdgeDirection,
}

impl EdgeKindDef {
    pub fn is_symmetric(&self) -> bool {
        matches!(self.direction, EdgeDirection::Symmetric)
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self.direction, EdgeDirection::Reverse { .. })
    }
}

/// Edge kinds a node kind can take part in, for node editors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sockets {
    /// (edge kind, label) pairs where the node is the target, named by their reverse
    pub inputs: Vec<(String, String)>,
    /// (edge kind, label) pairs where the node is the source
    pub outputs: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    node_types: IndexMap<String, RawNodeType>,
    #[serde(default)]
    edge_types: IndexMap<String, RawEdgeType>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNodeType {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdgeType {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    mapping: HashMap<String, serde_json::Value>,
    allowed_connections: RawAllowed,
    #[serde(default)]
    reverse: Option<RawReverse>,
}

#[derive(Debug, Deserialize)]
struct RawAllowed {
    #[serde(default)]
    source: Vec<String>,
    #[serde(default)]
    target: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawReverse {
    name: String,
    #[serde(default)]
    label: Option<String>,
}

/// Resolved edge rule with set lookups for validation
#[derive(Debug, Clone)]
struct EdgeRule {
    def: EdgeKindDef,
    sources: HashSet<String>,
    targets: HashSet<String>,
}

impl EdgeRule {
    fn new(def: EdgeKindDef) -> Self {
        Self {
            sources: def.sources.iter().cloned().collect(),
            targets: def.targets.iter().cloned().collect(),
            def,
        }
    }
}

/// Immutable table of node kinds and edge kinds
#[derive(Debug, Clone)]
pub struct Schema {
    version: String,
    node_kinds: IndexMap<String, NodeKindDef>,
    edge_kinds: IndexMap<String, EdgeRule>,
}

impl Schema {
    /// The embedded stratigraphic schema, parsed once per process
    pub fn builtin() -> Arc<Schema> {
        static BUILTIN: OnceLock<Arc<Schema>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                // Embedded asset; its validity is covered by tests
                Arc::new(Schema::from_json(BUILTIN_SCHEMA).expect("embedded schema is valid"))
            })
            .clone()
    }

    /// Parse a schema table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSchema = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Load a schema table from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading schema from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    fn from_raw(raw: RawSchema) -> Result<Self> {
        let mut node_kinds = IndexMap::new();
        for (name, def) in raw.node_types {
            if name == ROOT_NODE_KIND {
                return Err(Error::InvalidSchema(format!(
                    "'{}' is the implicit root and cannot be declared",
                    ROOT_NODE_KIND
                )));
            }
            node_kinds.insert(
                name.clone(),
                NodeKindDef {
                    label: def.label.unwrap_or_else(|| name.clone()),
                    parent: def.parent.filter(|p| p != ROOT_NODE_KIND),
                    name,
                },
            );
        }
        Self::check_hierarchy(&node_kinds)?;

        let mut edge_kinds: IndexMap<String, EdgeRule> = IndexMap::new();
        for (key, def) in raw.edge_types {
            let name = def.name.unwrap_or_else(|| key.clone());
            if name != key {
                return Err(Error::InvalidSchema(format!(
                    "edge type '{}' declares mismatched name '{}'",
                    key, name
                )));
            }
            let label = def.label.unwrap_or_else(|| name.clone());

            let direction = match &def.reverse {
                Some(reverse) => EdgeDirection::Canonical {
                    reverse: reverse.name.clone(),
                },
                None => EdgeDirection::Symmetric,
            };

            let canonical = EdgeKindDef {
                name: name.clone(),
                label: label.clone(),
                description: def.description.clone(),
                mapping: def.mapping.clone(),
                sources: def.allowed_connections.source.clone(),
                targets: def.allowed_connections.target.clone(),
                direction,
            };
            Self::insert_edge(&mut edge_kinds, canonical)?;

            if let Some(reverse) = def.reverse {
                let reverse_def = EdgeKindDef {
                    label: reverse.label.unwrap_or_else(|| reverse.name.clone()),
                    name: reverse.name,
                    description: format!("Reverse of {}: {}", label, def.description),
                    mapping: def.mapping,
                    sources: def.allowed_connections.target,
                    targets: def.allowed_connections.source,
                    direction: EdgeDirection::Reverse { canonical: name },
                };
                Self::insert_edge(&mut edge_kinds, reverse_def)?;
            }
        }

        let schema = Self {
            version: raw.version.unwrap_or_else(|| "unknown".to_string()),
            node_kinds,
            edge_kinds,
        };
        tracing::debug!(
            "Schema {} loaded: {} node kinds, {} edge kinds",
            schema.version,
            schema.node_kinds.len(),
            schema.edge_kinds.len()
        );
        Ok(schema)
    }

    fn insert_edge(edge_kinds: &mut IndexMap<String, EdgeRule>, def: EdgeKindDef) -> Result<()> {
        if edge_kinds.contains_key(&def.name) {
            return Err(Error::InvalidSchema(format!(
                "edge type '{}' is declared twice",
                def.name
            )));
        }
        edge_kinds.insert(def.name.clone(), EdgeRule::new(def));
        Ok(())
    }

    fn check_hierarchy(node_kinds: &IndexMap<String, NodeKindDef>) -> Result<()> {
        for def in node_kinds.values() {
            let mut seen = HashSet::new();
            let mut current = def;
            while let Some(parent) = &current.parent {
                if !seen.insert(current.name.as_str()) {
                    return Err(Error::InvalidSchema(format!(
                        "node type hierarchy has a cycle through '{}'",
                        current.name
                    )));
                }
                current = node_kinds.get(parent).ok_or_else(|| {
                    Error::InvalidSchema(format!(
                        "node type '{}' has unknown parent '{}'",
                        current.name, parent
                    ))
                })?;
            }
        }
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn node_kind(&self, name: &str) -> Option<&NodeKindDef> {
        self.node_kinds.get(name)
    }

    pub fn node_kinds(&self) -> impl Iterator<Item = &NodeKindDef> {
        self.node_kinds.values()
    }

    /// The kind itself followed by its ancestors, ending at [`ROOT_NODE_KIND`].
    /// Kinds the schema does not declare have only the root as ancestor.
    pub fn lineage<'a>(&'a self, kind: &'a str) -> Vec<&'a str> {
        let mut lineage = vec![kind];
        let mut current = self.node_kinds.get(kind);
        // The hierarchy is acyclic (checked on load)
        while let Some(parent) = current.and_then(|def| def.parent.as_deref()) {
            lineage.push(parent);
            current = self.node_kinds.get(parent);
        }
        if kind != ROOT_NODE_KIND {
            lineage.push(ROOT_NODE_KIND);
        }
        lineage
    }

    /// True when `kind` is `family` or descends from it
    pub fn is_kind_of(&self, kind: &str, family: &str) -> bool {
        self.lineage(kind).contains(&family)
    }

    pub fn edge_kind(&self, name: &str) -> Option<&EdgeKindDef> {
        self.edge_kinds.get(name).map(|rule| &rule.def)
    }

    pub fn edge_exists(&self, name: &str) -> bool {
        self.edge_kinds.contains_key(name)
    }

    /// Edge kind names in declaration order, each canonical followed by its reverse
    pub fn edge_kind_names(&self, canonical_only: bool) -> Vec<&str> {
        self.edge_kinds
            .values()
            .filter(|rule| !canonical_only || rule.def.is_canonical())
            .map(|rule| rule.def.name.as_str())
            .collect()
    }

    /// Whether an edge of `edge_kind` may connect a `source_kind` node to a
    /// `target_kind` node. Unknown edge kinds are never admissible.
    pub fn is_admissible(&self, source_kind: &str, target_kind: &str, edge_kind: &str) -> bool {
        let Some(rule) = self.edge_kinds.get(edge_kind) else {
            return false;
        };
        self.lineage(source_kind)
            .iter()
            .any(|k| rule.sources.contains(*k))
            && self
                .lineage(target_kind)
                .iter()
                .any(|k| rule.targets.contains(*k))
    }

    pub fn allowed_sources(&self, edge_kind: &str) -> &[String] {
        self.edge_kind(edge_kind)
            .map(|def| def.sources.as_slice())
            .unwrap_or(&[])
    }

    pub fn allowed_targets(&self, edge_kind: &str) -> &[String] {
        self.edge_kind(edge_kind)
            .map(|def| def.targets.as_slice())
            .unwrap_or(&[])
    }

    pub fn label(&self, edge_kind: &str) -> Option<&str> {
        self.edge_kind(edge_kind).map(|def| def.label.as_str())
    }

    pub fn is_symmetric(&self, edge_kind: &str) -> bool {
        self.edge_kind(edge_kind).is_some_and(EdgeKindDef::is_symmetric)
    }

    pub fn is_canonical(&self, edge_kind: &str) -> bool {
        self.edge_kind(edge_kind).is_some_and(EdgeKindDef::is_canonical)
    }

    /// The opposite-direction name; `None` for symmetric or unknown kinds
    pub fn reverse_name(&self, edge_kind: &str) -> Option<&str> {
        match &self.edge_kind(edge_kind)?.direction {
            EdgeDirection::Symmetric => None,
            EdgeDirection::Canonical { reverse } => Some(reverse.as_str()),
            EdgeDirection::Reverse { canonical } => Some(canonical.as_str()),
        }
    }

    pub fn canonical_name<'a>(&'a self, edge_kind: &'a str) -> Option<&'a str> {
        match &self.edge_kind(edge_kind)?.direction {
            EdgeDirection::Reverse { canonical } => Some(canonical.as_str()),
            _ => Some(edge_kind),
        }
    }

    /// Normalize an edge kind name, optionally folding reverses onto their canonical name
    pub fn normalize_edge_kind<'a>(
        &'a self,
        edge_kind: &'a str,
        prefer_canonical: bool,
    ) -> Option<&'a str> {
        if prefer_canonical {
            self.canonical_name(edge_kind)
        } else {
            self.edge_kind(edge_kind).map(|def| def.name.as_str())
        }
    }

    /// Input and output sockets for a node kind
    pub fn sockets(&self, node_kind: &str) -> Sockets {
        let lineage = self.lineage(node_kind);
        let mut sockets = Sockets::default();

        for rule in self.edge_kinds.values().filter(|r| r.def.is_canonical()) {
            let def = &rule.def;
            if lineage.iter().any(|k| rule.sources.contains(*k)) {
                sockets.outputs.push((def.name.clone(), def.label.clone()));
            }
            if lineage.iter().any(|k| rule.targets.contains(*k)) {
                let input = match &def.direction {
                    EdgeDirection::Canonical { reverse } => self
                        .edge_kind(reverse)
                        .map(|r| (r.name.clone(), r.label.clone())),
                    _ => None,
                };
                sockets
                    .inputs
                    .push(input.unwrap_or_else(|| (def.name.clone(), def.label.clone())));
            }
        }
        sockets
    }
}

/// Programmatic schema construction
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    version: Option<String>,
    node_types: IndexMap<String, RawNodeType>,
    edge_types: IndexMap<String, RawEdgeType>,
}

impl SchemaBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Declare a node kind, optionally under a parent family
    pub fn node_kind(mut self, name: impl Into<String>, parent: Option<&str>) -> Self {
        self.node_types.insert(
            name.into(),
            RawNodeType {
                label: None,
                parent: parent.map(str::to_string),
            },
        );
        self
    }

    /// Declare a symmetric edge kind
    pub fn edge(self, name: &str, sources: &[&str], targets: &[&str]) -> Self {
        self.edge_inner(name, None, sources, targets)
    }

    /// Declare a directed edge kind and its reverse
    pub fn edge_with_reverse(
        self,
        name: &str,
        reverse: &str,
        sources: &[&str],
        targets: &[&str],
    ) -> Self {
        self.edge_inner(name, Some(reverse), sources, targets)
    }

    fn edge_inner(
        mut self,
        name: &str,
        reverse: Option<&str>,
        sources: &[&str],
        targets: &[&str],
    ) -> Self {
        let to_vec = |kinds: &[&str]| kinds.iter().map(|k| k.to_string()).collect();
        self.edge_types.insert(
            name.to_string(),
            RawEdgeType {
                name: None,
                label: None,
                description: String::new(),
                mapping: HashMap::new(),
                allowed_connections: RawAllowed {
                    source: to_vec(sources),
                    target: to_vec(targets),
                },
                reverse: reverse.map(|r| RawReverse {
                    name: r.to_string(),
                    label: None,
                }),
            },
        );
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::from_raw(RawSchema {
            version: self.version,
            node_types: self.node_types,
            edge_types: self.edge_types,
        })
    }
}
