//! Node types and operations

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use ulid::Ulid;

/// Caller-supplied node identity, unique within a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh ULID-backed identity for adapters whose sources carry no usable id
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for NodeId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

/// Stratigraphic unit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StratigraphicType {
    /// Stratigraphic unit
    Us,
    /// Structural virtual stratigraphic unit
    Usvs,
    /// Non-structural virtual stratigraphic unit
    Usvn,
    /// Series of stratigraphic units
    SeriesSu,
    /// Series of non-structural virtual units
    SeriesUsvn,
    /// Series of structural virtual units
    SeriesUsvs,
    /// Special find
    SpecialFind,
    /// Virtual special find
    VirtualSpecialFind,
    /// Documentary stratigraphic unit
    Documentary,
    /// Transformation unit
    Transformation,
    /// Stratigraphic event
    Event,
    /// Continuity marker
    Continuity,
}

impl StratigraphicType {
    pub const ALL: [StratigraphicType; 12] = [
        Self::Us,
        Self::Usvs,
        Self::Usvn,
        Self::SeriesSu,
        Self::SeriesUsvn,
        Self::SeriesUsvs,
        Self::SpecialFind,
        Self::VirtualSpecialFind,
        Self::Documentary,
        Self::Transformation,
        Self::Event,
        Self::Continuity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "US",
            Self::Usvs => "USVs",
            Self::Usvn => "USVn",
            Self::SeriesSu => "serSU",
            Self::SeriesUsvn => "serUSVn",
            Self::SeriesUsvs => "serUSVs",
            Self::SpecialFind => "SF",
            Self::VirtualSpecialFind => "VSF",
            Self::Documentary => "USD",
            Self::Transformation => "TSU",
            Self::Event => "SE",
            Self::Continuity => "BR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Node kind classification
///
/// Well-known kinds are closed variants; anything else is carried verbatim
/// in [`NodeKind::Unrecognized`] so unknown data survives a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Stratigraphic(StratigraphicType),
    Property,
    Document,
    Extractor,
    Combiner,
    Epoch,
    ActivityGroup,
    ParadataGroup,
    TimeBranchGroup,
    Author,
    Link,
    GeoPosition,
    RepresentationModel,
    Unrecognized(String),
}

impl NodeKind {
    /// Tag used in schemas and interchange files
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Stratigraphic(t) => t.as_str(),
            NodeKind::Property => "property",
            NodeKind::Document => "document",
            NodeKind::Extractor => "extractor",
            NodeKind::Combiner => "combiner",
            NodeKind::Epoch => "EpochNode",
            NodeKind::ActivityGroup => "ActivityNodeGroup",
            NodeKind::ParadataGroup => "ParadataNodeGroup",
            NodeKind::TimeBranchGroup => "TimeBranchNodeGroup",
            NodeKind::Author => "author",
            NodeKind::Link => "link",
            NodeKind::GeoPosition => "geo_position",
            NodeKind::RepresentationModel => "representation_model",
            NodeKind::Unrecognized(s) => s,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, NodeKind::Unrecognized(_))
    }
}

impl AsRef<str> for NodeKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        if let Some(t) = StratigraphicType::parse(s) {
            return NodeKind::Stratigraphic(t);
        }
        match s {
            "property" => NodeKind::Property,
            "document" => NodeKind::Document,
            "extractor" => NodeKind::Extractor,
            "combiner" => NodeKind::Combiner,
            "EpochNode" => NodeKind::Epoch,
            "ActivityNodeGroup" => NodeKind::ActivityGroup,
            "ParadataNodeGroup" => NodeKind::ParadataGroup,
            "TimeBranchNodeGroup" => NodeKind::TimeBranchGroup,
            "author" => NodeKind::Author,
            "link" => NodeKind::Link,
            "geo_position" => NodeKind::GeoPosition,
            "representation_model" => NodeKind::RepresentationModel,
            other => NodeKind::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from(s.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Unrecognized(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Time span of an epoch, in years (negative = BCE)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSpan {
    pub start: f64,
    pub end: f64,
}

impl EpochSpan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: f64) -> bool {
        self.start <= year && year <= self.end
    }
}

/// Typed fields carried by well-known node kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDetails {
    #[default]
    None,
    Epoch {
        start: f64,
        end: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Property {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property_type: Option<String>,
    },
    Document {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Extractor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    Combiner {
        #[serde(default)]
        sources: Vec<String>,
    },
    Author {
        orcid: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surname: Option<String>,
    },
    Link {
        url: String,
    },
    GeoPosition {
        epsg: u32,
        #[serde(default)]
        shift_x: f64,
        #[serde(default)]
        shift_y: f64,
        #[serde(default)]
        shift_z: f64,
    },
}

impl NodeDetails {
    pub fn is_none(&self) -> bool {
        matches!(self, NodeDetails::None)
    }
}

/// A node in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecord")]
pub struct Node {
    /// Identity (immutable once inserted)
    pub id: NodeId,

    /// Node kind
    pub kind: NodeKind,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Free-form attributes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Kind-specific typed fields
    #[serde(default, skip_serializing_if = "NodeDetails::is_none")]
    pub details: NodeDetails,
}

/// Wire form of [`Node`]; a missing name falls back to the id
#[derive(Deserialize)]
struct NodeRecord {
    id: NodeId,
    kind: NodeKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    details: NodeDetails,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Self {
            name: record.name.unwrap_or_else(|| record.id.0.clone()),
            id: record.id,
            kind: record.kind,
            description: record.description,
            attributes: record.attributes,
            details: record.details,
        }
    }
}

impl Node {
    /// Create a new node; the name defaults to the id
    pub fn new(id: impl Into<NodeId>, kind: impl Into<NodeKind>) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            kind: kind.into(),
            description: String::new(),
            attributes: HashMap::new(),
            details: NodeDetails::None,
        }
    }

    /// Stratigraphic unit of the given type
    pub fn stratigraphic(id: impl Into<NodeId>, unit: StratigraphicType) -> Self {
        Self::new(id, NodeKind::Stratigraphic(unit))
    }

    /// Epoch node with its time span
    pub fn epoch(id: impl Into<NodeId>, name: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(id, NodeKind::Epoch)
            .with_name(name)
            .with_details(NodeDetails::Epoch {
                start,
                end,
                color: None,
            })
    }

    /// Property node holding a value
    pub fn property(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self::new(id, NodeKind::Property)
            .with_details(NodeDetails::Property {
                value: Some(value.into()),
                property_type: Some(name.clone()),
            })
            .with_name(name)
    }

    /// Document node with an optional url
    pub fn document(id: impl Into<NodeId>, name: impl Into<String>, url: Option<String>) -> Self {
        Self::new(id, NodeKind::Document)
            .with_name(name)
            .with_details(NodeDetails::Document { url })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_details(mut self, details: NodeDetails) -> Self {
        self.details = details;
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Set an attribute, returning the previous value
    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.attributes.insert(key.into(), value.into())
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<serde_json::Value> {
        self.attributes.remove(key)
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Epoch span, if this node carries one
    pub fn epoch_span(&self) -> Option<EpochSpan> {
        match &self.details {
            NodeDetails::Epoch { start, end, .. } => Some(EpochSpan::new(*start, *end)),
            _ => None,
        }
    }

    /// Update the epoch span, keeping any colour already set
    pub fn set_epoch_span(&mut self, start: f64, end: f64) {
        match &mut self.details {
            NodeDetails::Epoch {
                start: s, end: e, ..
            } => {
                *s = start;
                *e = end;
            }
            details => {
                *details = NodeDetails::Epoch {
                    start,
                    end,
                    color: None,
                }
            }
        }
    }
}
