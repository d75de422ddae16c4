//! Graph node types.
//!
//! A `Node` is one vertex of the business graph: an entity (asset),
//! algorithm, workflow, or skill. Ids are derived from the record's kind and
//! name, so compiling the same specs always yields the same ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The kind of thing a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// A domain entity (business asset).
    Asset,
    /// A computation declared in the algorithm specs.
    Algorithm,
    /// A business process.
    Workflow,
    /// An agent capability.
    Skill,
    Rule,
    Pipeline,
    Source,
}

impl NodeType {
    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Algorithm => "ALGORITHM",
            Self::Workflow => "WORKFLOW",
            Self::Skill => "SKILL",
            Self::Rule => "RULE",
            Self::Pipeline => "PIPELINE",
            Self::Source => "SOURCE",
        }
    }

    /// Parses a type name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let ty = match s.to_ascii_uppercase().as_str() {
            "ASSET" => Self::Asset,
            "ALGORITHM" => Self::Algorithm,
            "WORKFLOW" => Self::Workflow,
            "SKILL" => Self::Skill,
            "RULE" => Self::Rule,
            "PIPELINE" => Self::Pipeline,
            "SOURCE" => Self::Source,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive metadata attached to a node.
///
/// The well-known keys are typed; anything else found in a persisted
/// document is kept in `extra` so it survives a load/save cycle. Documents
/// from other producers may omit every key, so all of them are optional on
/// read and empty strings are not written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub business_criticality: String,

    /// Number of declared fields (entities only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_count: Option<usize>,

    /// Service-level agreement (workflows only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NodeMetadata {
    /// Creates metadata with the given owner and criticality.
    pub fn new(owner: impl Into<String>, business_criticality: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            business_criticality: business_criticality.into(),
            fields_count: None,
            sla: None,
            extra: BTreeMap::new(),
        }
    }
}

/// A typed vertex in the business graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique id, e.g. `asset.entity.order`.
    pub id: String,

    #[serde(rename = "type")]
    pub node_type: NodeType,

    /// Human-readable name.
    pub label: String,

    #[serde(default)]
    pub metadata: NodeMetadata,

    /// Id of the external status hook for this node. A naming convention,
    /// not an ownership relation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_source: Option<String>,
}

impl Node {
    /// Creates a node with default metadata (`System` owner, `MEDIUM` criticality).
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            metadata: NodeMetadata::new("System", "MEDIUM"),
            status_source: None,
        }
    }

    /// Builder: replace the metadata.
    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder: set the status hook id.
    pub fn with_status_source(mut self, hook: impl Into<String>) -> Self {
        self.status_source = Some(hook.into());
        self
    }
}
