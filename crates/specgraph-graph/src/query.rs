//! Read-only query service over a persisted graph.
//!
//! The service loads the document on first use and keeps the indexed
//! snapshot for its lifetime. The load runs under a mutex so concurrent
//! first callers parse the document once; afterwards readers share the
//! snapshot through an `Arc` without further locking.

use crate::model::GraphModel;
use crate::snapshot::{EdgesForNode, GraphSnapshot, GraphStats, LineageDirection};
use crate::store::{GraphSource, GraphStore, StoreError};
use specgraph_core::{Node, NodeType};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Lazily loaded, memoized view over a graph document.
pub struct GraphQueryService {
    source: Box<dyn GraphSource>,
    snapshot: Mutex<Option<Arc<GraphSnapshot>>>,
}

impl std::fmt::Debug for GraphQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQueryService")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl GraphQueryService {
    /// Creates a service over `source`. Nothing is read until the first query.
    pub fn new(source: impl GraphSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            snapshot: Mutex::new(None),
        }
    }

    /// Creates a service over the JSON document at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(GraphStore::open(path))
    }

    /// Returns the cached snapshot, loading it on first call.
    ///
    /// A missing document loads as an empty graph.
    pub fn snapshot(&self) -> Result<Arc<GraphSnapshot>, StoreError> {
        let mut slot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let model = match self.source.load_graph()? {
            Some(model) => model,
            None => {
                info!("No graph document yet, serving an empty graph");
                GraphModel::empty()
            }
        };
        debug!(
            "Loaded graph {} ({} nodes, {} edges)",
            model.version,
            model.node_count(),
            model.edge_count()
        );

        let snapshot = Arc::new(GraphSnapshot::new(model));
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drops the cached snapshot; the next query reloads from the source.
    pub fn reload(&self) {
        let mut slot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// True once a snapshot has been loaded and cached.
    pub fn is_loaded(&self) -> bool {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The full document.
    pub fn get_graph(&self) -> Result<GraphModel, StoreError> {
        Ok(self.snapshot()?.model().clone())
    }

    /// A node by id, or `None` if absent.
    pub fn get_node(&self, id: &str) -> Result<Option<Node>, StoreError> {
        Ok(self.snapshot()?.get_node(id).cloned())
    }

    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Result<Vec<Node>, StoreError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .get_nodes_by_type(node_type)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_edges_for_node(&self, id: &str) -> Result<EdgesForNode, StoreError> {
        Ok(self.snapshot()?.get_edges_for_node(id))
    }

    /// Ids reached from `id` in `direction`, in visitation order.
    pub fn get_lineage(
        &self,
        id: &str,
        direction: LineageDirection,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.snapshot()?.get_lineage(id, direction))
    }

    /// Nodes whose id or label contains `query`, ignoring case.
    pub fn search_nodes(&self, query: &str) -> Result<Vec<Node>, StoreError> {
        let snapshot = self.snapshot()?;
        Ok(snapshot.search_nodes(query).into_iter().cloned().collect())
    }

    pub fn get_stats(&self) -> Result<GraphStats, StoreError> {
        Ok(self.snapshot()?.stats())
    }
}
