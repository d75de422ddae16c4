//! Process-wide services, built once and handed to callers by reference.

use crate::compiler::{CompileError, CompileOptions, CompileOutput, GraphCompiler};
use crate::dependency::DependencyIndex;
use crate::query::GraphQueryService;
use crate::store::{GraphStore, StoreError};
use specgraph_core::{LoadedSpecs, SpecError, SpecStore};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from building or refreshing a context.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error(transparent)]
    Specs(#[from] SpecError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Where a context reads specs from and writes the graph to.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub specs_dir: PathBuf,
    pub graph_path: PathBuf,
    pub compile: CompileOptions,
}

impl ContextConfig {
    pub fn new(specs_dir: impl Into<PathBuf>, graph_path: impl Into<PathBuf>) -> Self {
        Self {
            specs_dir: specs_dir.into(),
            graph_path: graph_path.into(),
            compile: CompileOptions::default(),
        }
    }

    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile = options;
        self
    }
}

/// Owns the query service over the persisted graph and the dependency
/// index over the current entity specs.
#[derive(Debug)]
pub struct PlatformContext {
    config: ContextConfig,
    specs: SpecStore,
    store: GraphStore,
    query: GraphQueryService,
    dependencies: DependencyIndex,
}

impl PlatformContext {
    /// Loads the specs and prepares the services.
    ///
    /// The graph document is not read until the first query.
    pub fn open(config: ContextConfig) -> Result<Self, ContextError> {
        let specs = SpecStore::new(&config.specs_dir);
        let loaded = specs.load()?;
        log_rejected(&loaded);

        let dependencies = DependencyIndex::from_specs(&loaded.bundle);
        let store = GraphStore::open(&config.graph_path);
        let query = GraphQueryService::new(store.clone());

        Ok(Self {
            config,
            specs,
            store,
            query,
            dependencies,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn query(&self) -> &GraphQueryService {
        &self.query
    }

    pub fn dependencies(&self) -> &DependencyIndex {
        &self.dependencies
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Compiles the current specs and persists the result.
    ///
    /// Refreshes the dependency index and invalidates the cached query
    /// snapshot so both reflect what was just written.
    pub fn compile_and_persist(&mut self) -> Result<CompileOutput, ContextError> {
        let loaded = self.specs.load()?;
        log_rejected(&loaded);

        let compiler = GraphCompiler::with_options(self.config.compile.clone());
        let mut output = compiler.compile(&loaded.bundle)?;
        // Store-level rejections come first; they precede compilation.
        let mut rejected = loaded.rejected;
        rejected.append(&mut output.rejected);
        output.rejected = rejected;

        self.store.save_graph(&output.graph)?;
        info!(
            "Compiled {} nodes and {} edges into {}",
            output.graph.node_count(),
            output.graph.edge_count(),
            self.store.path().display()
        );

        self.dependencies = DependencyIndex::from_specs(&loaded.bundle);
        self.query.reload();
        Ok(output)
    }
}

fn log_rejected(loaded: &LoadedSpecs) {
    for record in &loaded.rejected {
        warn!("Skipped spec record {}", record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ReferencePolicy;
    use crate::snapshot::LineageDirection;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn write_specs(dir: &std::path::Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("entities.json"),
            r#"{"entities": [
                {"id": "order", "name": "Order",
                 "fields": [{"name": "customer_id", "type": "uuid", "references": "Customer"}],
                 "relationships": [{"targetEntity": "customer", "type": "belongs_to", "required": true}]},
                {"id": "customer", "name": "Customer"}
            ]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("workflows.json"),
            r#"{"workflows": [{"id": "checkout", "consumes": ["Order"], "produces": ["Invoice"]}]}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_open_before_compile_serves_empty_graph() {
        let dir = tempdir().unwrap();
        let specs = dir.path().join("specs");
        write_specs(&specs);

        let context =
            PlatformContext::open(ContextConfig::new(&specs, dir.path().join("graph.json")))
                .unwrap();

        assert_eq!(context.query().get_stats().unwrap().total_nodes, 0);
        assert_eq!(
            context.dependencies().get_dependencies("order"),
            BTreeSet::from(["customer".to_string()])
        );
    }

    #[test]
    fn test_compile_and_persist_refreshes_queries() {
        let dir = tempdir().unwrap();
        let specs = dir.path().join("specs");
        write_specs(&specs);
        let graph_path = dir.path().join("data").join("graph.json");

        let mut context =
            PlatformContext::open(ContextConfig::new(&specs, &graph_path)).unwrap();
        assert_eq!(context.query().get_stats().unwrap().total_nodes, 0);

        let output = context.compile_and_persist().unwrap();
        assert!(graph_path.exists());
        assert_eq!(output.graph.node_count(), 3);
        // Invoice is not a known entity.
        assert_eq!(output.dropped.len(), 1);

        let stats = context.query().get_stats().unwrap();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(
            context
                .query()
                .get_lineage("asset.entity.customer", LineageDirection::Upstream)
                .unwrap(),
            vec!["asset.entity.order", "wf.process.checkout"]
        );
    }

    #[test]
    fn test_strict_policy_fails_and_leaves_artifact_untouched() {
        let dir = tempdir().unwrap();
        let specs = dir.path().join("specs");
        write_specs(&specs);
        let graph_path = dir.path().join("graph.json");

        let config = ContextConfig::new(&specs, &graph_path).with_compile_options(CompileOptions {
            reference_policy: ReferencePolicy::Strict,
            ..CompileOptions::default()
        });
        let mut context = PlatformContext::open(config).unwrap();

        let err = context.compile_and_persist().unwrap_err();
        assert!(matches!(
            err,
            ContextError::Compile(CompileError::DanglingReferences(_))
        ));
        assert!(!graph_path.exists());
    }

    #[test]
    fn test_rejected_store_records_are_reported() {
        let dir = tempdir().unwrap();
        let specs = dir.path().join("specs");
        fs::create_dir_all(&specs).unwrap();
        fs::write(
            specs.join("entities.json"),
            r#"{"entities": [{"name": "Order"}, {"relationships": [{"type": "x"}]}, {"id": "nameless"}]}"#,
        )
        .unwrap();

        let mut context =
            PlatformContext::open(ContextConfig::new(&specs, dir.path().join("g.json"))).unwrap();
        let output = context.compile_and_persist().unwrap();

        assert_eq!(output.graph.node_count(), 1);
        // One shape failure from the store, one nameless entity from the compiler.
        assert_eq!(output.rejected.len(), 2);
        assert_eq!(output.rejected[0].index, 1);
        assert_eq!(output.rejected[1].reason, "missing name");
        // Positions refer to the file, not to the records that survived loading.
        assert_eq!(output.rejected[1].index, 2);
    }
}
