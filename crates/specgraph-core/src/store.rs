//! File-backed spec store.
//!
//! Specs live in a directory as one JSON file per collection:
//!
//! ```text
//! specs/
//!   entities.json    {"entities":   [...]}
//!   workflows.json   {"workflows":  [...]}
//!   algorithms.json  {"algorithms": [...]}
//!   skills.json      {"skills":     [...]}   (optional)
//! ```
//!
//! Missing files are empty collections. Records are deserialized one at a
//! time so a single malformed record is reported and skipped.

use crate::error::{Result, SpecError};
use crate::spec::{RejectedRecord, SourceIndexed, SpecBundle, SpecKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of loading a specs directory.
#[derive(Debug, Default)]
pub struct LoadedSpecs {
    pub bundle: SpecBundle,
    /// Records whose shape could not be read.
    pub rejected: Vec<RejectedRecord>,
}

/// Reads spec collections from a directory.
#[derive(Debug, Clone)]
pub struct SpecStore {
    root: PathBuf,
}

impl SpecStore {
    /// Creates a store rooted at `root`. Nothing is read until `load`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this store reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads every collection.
    pub fn load(&self) -> Result<LoadedSpecs> {
        let mut rejected = Vec::new();

        let bundle = SpecBundle {
            entities: self.load_collection("entities", SpecKind::Entity, &mut rejected)?,
            algorithms: self.load_collection("algorithms", SpecKind::Algorithm, &mut rejected)?,
            workflows: self.load_collection("workflows", SpecKind::Workflow, &mut rejected)?,
            skills: self.load_collection("skills", SpecKind::Skill, &mut rejected)?,
        };

        debug!(
            "Loaded specs from {}: {} entities, {} algorithms, {} workflows, {} skills",
            self.root.display(),
            bundle.entities.len(),
            bundle.algorithms.len(),
            bundle.workflows.len(),
            bundle.skills.len()
        );

        Ok(LoadedSpecs { bundle, rejected })
    }

    fn load_collection<T: DeserializeOwned + SourceIndexed>(
        &self,
        key: &'static str,
        kind: SpecKind,
        rejected: &mut Vec<RejectedRecord>,
    ) -> Result<Vec<T>> {
        let path = self.root.join(format!("{}.json", key));
        if !path.exists() {
            debug!("No {} found, treating as empty", path.display());
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&path).map_err(|source| SpecError::Io {
            path: path.clone(),
            source,
        })?;
        let document: Value = serde_json::from_str(&text).map_err(|source| SpecError::Parse {
            path: path.clone(),
            source,
        })?;

        let records = match document.get(key) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(records)) => records,
            Some(_) => return Err(SpecError::InvalidCollection { path, key }),
        };

        let mut parsed = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match serde_json::from_value::<T>(record.clone()) {
                Ok(mut spec) => {
                    spec.set_source_index(index);
                    parsed.push(spec);
                }
                Err(e) => {
                    warn!("Skipping malformed {} record #{}: {}", kind, index, e);
                    rejected.push(RejectedRecord::new(kind, index, e.to_string()));
                }
            }
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = SpecStore::new(dir.path().join("nope"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.bundle, SpecBundle::default());
        assert!(loaded.rejected.is_empty());
    }

    #[test]
    fn test_load_all_collections() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("entities.json"),
            r#"{"entities": [{"id": "order", "name": "Order"}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("workflows.json"),
            r#"{"workflows": [{"id": "checkout", "produces": ["Order"]}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("algorithms.json"), r#"{"algorithms": []}"#).unwrap();

        let loaded = SpecStore::new(dir.path()).load().unwrap();
        assert_eq!(loaded.bundle.entities.len(), 1);
        assert_eq!(loaded.bundle.workflows[0].produces, vec!["Order"]);
        assert!(loaded.bundle.algorithms.is_empty());
        assert!(loaded.bundle.skills.is_empty());
    }

    #[test]
    fn test_malformed_record_is_rejected_individually() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("entities.json"),
            r#"{"entities": [
                {"id": "a", "name": "A"},
                {"id": "b", "name": "B", "fields": "not-a-list"},
                {"id": "c", "name": "C"}
            ]}"#,
        )
        .unwrap();

        let loaded = SpecStore::new(dir.path()).load().unwrap();
        assert_eq!(loaded.bundle.entities.len(), 2);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].kind, SpecKind::Entity);
        assert_eq!(loaded.rejected[0].index, 1);

        let positions: Vec<Option<usize>> = loaded
            .bundle
            .entities
            .iter()
            .map(|e| e.source_index)
            .collect();
        assert_eq!(positions, vec![Some(0), Some(2)]);
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("workflows.json"), "{ not json").unwrap();

        let err = SpecStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
    }

    #[test]
    fn test_collection_must_be_array() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("algorithms.json"), r#"{"algorithms": {}}"#).unwrap();

        let err = SpecStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(
            err,
            SpecError::InvalidCollection {
                key: "algorithms",
                ..
            }
        ));
    }
}
