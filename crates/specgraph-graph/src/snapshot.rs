//! Indexed, read-only view over a graph document.
//!
//! A `GraphSnapshot` wraps a loaded `GraphModel` and adds indexes for
//! fast lookups. It is built once per load and never mutated, so it can be
//! shared freely between readers.

use crate::edge::Edge;
use crate::model::GraphModel;
use crate::search_index::SearchIndex;
use serde::{Deserialize, Serialize};
use specgraph_core::{Node, NodeType};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Which way to follow edges when computing lineage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineageDirection {
    /// Towards edge sources: what feeds into this node.
    #[default]
    Upstream,
    /// Towards edge targets: what this node feeds into.
    Downstream,
}

impl std::fmt::Display for LineageDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineageDirection::Upstream => write!(f, "upstream"),
            LineageDirection::Downstream => write!(f, "downstream"),
        }
    }
}

impl FromStr for LineageDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upstream" => Ok(Self::Upstream),
            "downstream" => Ok(Self::Downstream),
            other => Err(format!(
                "unknown direction '{}' (expected upstream or downstream)",
                other
            )),
        }
    }
}

/// Edges touching a node, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgesForNode {
    pub incoming: Vec<Edge>,
    pub outgoing: Vec<Edge>,
}

/// Graph statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: BTreeMap<String, usize>,
    pub edges_by_relation: BTreeMap<String, usize>,
}

/// A loaded graph document with lookup indexes.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    model: GraphModel,

    /// Maps node ids to their position in `model.nodes` (first wins).
    id_index: HashMap<String, usize>,

    /// Maps node ids to positions of edges targeting them, in document order.
    incoming: HashMap<String, Vec<usize>>,

    /// Maps node ids to positions of edges leaving them, in document order.
    outgoing: HashMap<String, Vec<usize>>,

    /// Substring index over ids and labels.
    search_index: SearchIndex,
}

impl Default for GraphSnapshot {
    fn default() -> Self {
        Self::new(GraphModel::empty())
    }
}

impl GraphSnapshot {
    /// Indexes a document.
    ///
    /// Edges are indexed by id even when an endpoint is not a node of the
    /// document, so lineage over hand-written documents still works.
    pub fn new(model: GraphModel) -> Self {
        let mut id_index = HashMap::new();
        let mut search_index = SearchIndex::new();
        for (pos, node) in model.nodes.iter().enumerate() {
            id_index.entry(node.id.clone()).or_insert(pos);
            search_index.insert(&node.id, pos);
            search_index.insert(&node.label, pos);
        }

        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, edge) in model.edges.iter().enumerate() {
            incoming.entry(edge.target.clone()).or_default().push(pos);
            outgoing.entry(edge.source.clone()).or_default().push(pos);
        }

        Self {
            model,
            id_index,
            incoming,
            outgoing,
            search_index,
        }
    }

    /// The underlying document.
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn node_count(&self) -> usize {
        self.model.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.model.edges.len()
    }

    /// Gets a node by id.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        let pos = self.id_index.get(id)?;
        self.model.nodes.get(*pos)
    }

    /// Gets all nodes of a type, in document order.
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.model
            .nodes
            .iter()
            .filter(|node| node.node_type == node_type)
            .collect()
    }

    fn edges_at(&self, index: &HashMap<String, Vec<usize>>, id: &str) -> Vec<&Edge> {
        index
            .get(id)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|pos| self.model.edges.get(*pos))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Gets edges pointing at `id`.
    pub fn incoming_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges_at(&self.incoming, id)
    }

    /// Gets edges leaving `id`.
    pub fn outgoing_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges_at(&self.outgoing, id)
    }

    /// Gets every edge touching `id`.
    pub fn get_edges_for_node(&self, id: &str) -> EdgesForNode {
        EdgesForNode {
            incoming: self.incoming_edges(id).into_iter().cloned().collect(),
            outgoing: self.outgoing_edges(id).into_iter().cloned().collect(),
        }
    }

    /// Depth-first lineage from `id`.
    ///
    /// Upstream follows edges targeting the current node and collects their
    /// sources; downstream does the reverse. Each reached node appears once,
    /// in the order it was first visited, and `id` itself is never included.
    pub fn get_lineage(&self, id: &str, direction: LineageDirection) -> Vec<String> {
        let index = match direction {
            LineageDirection::Upstream => &self.incoming,
            LineageDirection::Downstream => &self.outgoing,
        };

        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);

        // (node, next edge to follow) so traversal order matches recursion
        let mut stack: Vec<(&str, usize)> = vec![(id, 0)];

        while let Some(&(current, cursor)) = stack.last() {
            let next_edge = index
                .get(current)
                .and_then(|positions| positions.get(cursor))
                .and_then(|pos| self.model.edges.get(*pos));

            let Some(edge) = next_edge else {
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let neighbor = match direction {
                LineageDirection::Upstream => edge.source.as_str(),
                LineageDirection::Downstream => edge.target.as_str(),
            };
            if visited.insert(neighbor) {
                result.push(neighbor.to_string());
                stack.push((neighbor, 0));
            }
        }

        result
    }

    /// Finds nodes whose id or label contains `query`, ignoring case.
    pub fn search_nodes(&self, query: &str) -> Vec<&Node> {
        self.search_index
            .search(query)
            .into_iter()
            .filter_map(|pos| self.model.nodes.get(pos))
            .collect()
    }

    /// Counts nodes by type and edges by relation.
    pub fn stats(&self) -> GraphStats {
        let mut nodes_by_type = BTreeMap::new();
        for node in &self.model.nodes {
            *nodes_by_type
                .entry(node.node_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut edges_by_relation = BTreeMap::new();
        for edge in &self.model.edges {
            *edges_by_relation
                .entry(edge.relation.as_str().to_string())
                .or_insert(0) += 1;
        }

        GraphStats {
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            nodes_by_type,
            edges_by_relation,
        }
    }
}
