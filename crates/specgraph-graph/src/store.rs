//! Artifact persistence for the graph document.
//!
//! The document is stored as pretty-printed JSON. Saves go through a
//! temporary file and a rename, so readers only ever see a complete
//! snapshot.

use crate::model::GraphModel;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere a graph document can be read from.
///
/// `Ok(None)` means no document exists yet.
pub trait GraphSource: Send + Sync {
    fn load_graph(&self) -> Result<Option<GraphModel>, StoreError>;
}

/// JSON file holding the compiled graph.
#[derive(Debug, Clone)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    /// Creates a store for the document at `path`. The file need not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves the graph, replacing any previous document.
    pub fn save_graph(&self, graph: &GraphModel) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let json = serde_json::to_string_pretty(graph)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        info!(
            "Wrote {} ({} nodes, {} edges)",
            self.path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }

    /// Loads the graph, or `None` when no document has been written.
    pub fn load_graph(&self) -> Result<Option<GraphModel>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No graph document at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let graph = serde_json::from_str(&text)?;
        Ok(Some(graph))
    }

    /// Removes the stored document.
    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl GraphSource for GraphStore {
    fn load_graph(&self) -> Result<Option<GraphModel>, StoreError> {
        GraphStore::load_graph(self)
    }
}

/// An in-memory document serves as its own source.
impl GraphSource for GraphModel {
    fn load_graph(&self) -> Result<Option<GraphModel>, StoreError> {
        Ok(Some(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Edge, Relation};
    use specgraph_core::{Node, NodeType};
    use tempfile::tempdir;

    #[test]
    fn test_save_load_graph() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("data").join("graph.json"));

        let graph = GraphModel::new(
            "2.0",
            vec![
                Node::new("a", NodeType::Asset, "A"),
                Node::new("b", NodeType::Asset, "B"),
            ],
            vec![Edge::new("a", "b", Relation::DependsOn, "a references b")],
        );
        store.save_graph(&graph).unwrap();

        let loaded = store.load_graph().unwrap().unwrap();
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_missing_document_is_none() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.json"));
        assert!(store.load_graph().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = GraphStore::open(&path).load_graph().unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn test_save_replaces_previous_document() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path().join("graph.json"));

        let first = GraphModel::new("2.0", vec![Node::new("a", NodeType::Asset, "A")], vec![]);
        store.save_graph(&first).unwrap();
        store.save_graph(&GraphModel::empty()).unwrap();

        let loaded = store.load_graph().unwrap().unwrap();
        assert_eq!(loaded.node_count(), 0);

        store.clear().unwrap();
        assert!(store.load_graph().unwrap().is_none());
    }
}
