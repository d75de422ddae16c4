//! Specgraph Graph - Compilation, planning and lineage
//!
//! This crate turns spec records into a typed dependency graph, persists it
//! as a JSON document, and answers questions about it: what a node depends
//! on, what breaks if an entity changes, and in which order a batch of
//! changes can land safely.
//!
//! # Architecture
//!
//! - `GraphCompiler` is a pure transform from a `SpecBundle` to a `GraphModel`
//! - `GraphStore` writes and reads the document atomically
//! - `GraphQueryService` loads the document once and serves lookups from an
//!   indexed `GraphSnapshot` (id, adjacency and n-gram search indexes)
//! - `DependencyIndex` works directly on entity relationships for impact,
//!   conflict and change-order analysis
//! - `PlatformContext` owns the long-lived services
//!
//! # Example
//!
//! ```no_run
//! use specgraph_graph::{ContextConfig, LineageDirection, PlatformContext};
//!
//! let mut context =
//!     PlatformContext::open(ContextConfig::new("specs", "src/data/graph.json")).unwrap();
//! context.compile_and_persist().unwrap();
//!
//! let upstream = context
//!     .query()
//!     .get_lineage("asset.entity.customer", LineageDirection::Upstream)
//!     .unwrap();
//! let order = context.dependencies().get_change_order(&["order", "customer"]);
//! ```

mod compiler;
mod context;
mod dependency;
mod edge;
mod model;
mod query;
mod search_index;
mod snapshot;
mod store;

pub use compiler::{
    algorithm_node_id, entity_node_id, skill_node_id, workflow_node_id, CompileError,
    CompileOptions, CompileOutput, DroppedReference, GraphCompiler, ReferencePolicy,
};
pub use context::{ContextConfig, ContextError, PlatformContext};
pub use dependency::{
    ChangeRisk, DependencyIndex, EntityDependencyNode, EntityInfo, LOW_RISK_MAX_IMPACT,
    MEDIUM_RISK_MAX_IMPACT,
};
pub use edge::{Edge, Relation};
pub use model::{GraphModel, DEFAULT_GRAPH_VERSION};
pub use query::GraphQueryService;
pub use search_index::{NodePos, SearchIndex};
pub use snapshot::{EdgesForNode, GraphSnapshot, GraphStats, LineageDirection};
pub use store::{GraphSource, GraphStore, StoreError};
