//! The graph document.
//!
//! `GraphModel` is the unit of persistence: a versioned, timestamped list
//! of nodes and edges. It is regenerated from scratch on every compile and
//! never patched in place.

use crate::edge::Edge;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use specgraph_core::Node;
use std::collections::HashSet;

/// Version stamped on documents when nothing else is configured.
pub const DEFAULT_GRAPH_VERSION: &str = "2.0";

fn default_version() -> String {
    DEFAULT_GRAPH_VERSION.to_string()
}

/// A full snapshot of the business graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default = "default_version")]
    pub version: String,

    /// When the document was compiled. Absent on cold-start documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub nodes: Vec<Node>,

    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl GraphModel {
    /// An empty, untimestamped document with the default version.
    pub fn empty() -> Self {
        Self {
            version: default_version(),
            generated_at: None,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Creates a document stamped with the current time.
    pub fn new(version: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            version: version.into(),
            generated_at: Some(Utc::now()),
            nodes,
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True when both documents hold the same nodes and edges in the same
    /// order. Version and timestamp are ignored.
    pub fn same_content(&self, other: &GraphModel) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }

    /// Returns edges whose source or target is not a node of this document.
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        self.edges
            .iter()
            .filter(|e| !ids.contains(e.source.as_str()) || !ids.contains(e.target.as_str()))
            .collect()
    }
}
