//! Specgraph Core - Spec records and graph node types
//!
//! This crate holds the shapes everything else is built from: the entity,
//! workflow, algorithm and skill records supplied by the spec store, and the
//! typed `Node` that the compiler turns them into.
//!
//! # Example
//!
//! ```no_run
//! use specgraph_core::SpecStore;
//!
//! let loaded = SpecStore::new("specs").load().unwrap();
//! println!("{} entities", loaded.bundle.entities.len());
//! for rejected in &loaded.rejected {
//!     eprintln!("skipped {}", rejected);
//! }
//! ```

mod error;
mod node;
mod spec;
mod store;

pub use error::{Result, SpecError};
pub use node::{Node, NodeMetadata, NodeType};
pub use spec::{
    AlgorithmSpec, EntitySpec, FieldSpec, RejectedRecord, RelationshipSpec, SkillSpec,
    SourceIndexed, SpecBundle, SpecKind, WorkflowSpec,
};
pub use store::{LoadedSpecs, SpecStore};
