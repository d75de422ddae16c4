//! Graph compiler: spec records in, graph document out.
//!
//! Compilation is a pure two-pass transform:
//! 1. Turn every valid record into a node (entities, then algorithms, then
//!    workflows, then skills)
//! 2. Infer edges from field references and workflow data flow, keeping
//!    only those whose endpoints were emitted in pass 1
//!
//! The output order is fixed so that compiling the same specs twice gives
//! identical node and edge lists.

use crate::edge::{Edge, Relation};
use crate::model::{GraphModel, DEFAULT_GRAPH_VERSION};
use serde::{Deserialize, Serialize};
use specgraph_core::{
    AlgorithmSpec, EntitySpec, Node, NodeMetadata, NodeType, RejectedRecord, SkillSpec,
    SpecBundle, SpecKind, WorkflowSpec,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const DEFAULT_OWNER: &str = "System";
const DEFAULT_CRITICALITY: &str = "MEDIUM";
const DEFAULT_WORKFLOW_CRITICALITY: &str = "HIGH";
const DEFAULT_SLA: &str = "None";
const SKILL_OWNER: &str = "Agent";

/// Node id for an entity name.
pub fn entity_node_id(name: &str) -> String {
    format!("asset.entity.{}", name.to_lowercase())
}

/// Node id for an algorithm's id (or name).
pub fn algorithm_node_id(key: &str) -> String {
    format!("algo.compute.{}", key)
}

/// Node id for a workflow's id (or name).
pub fn workflow_node_id(key: &str) -> String {
    format!("wf.process.{}", key)
}

/// Node id for a skill's id (or name).
pub fn skill_node_id(key: &str) -> String {
    format!("skill.agent.{}", key)
}

/// What to do with an inferred edge whose target node does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Drop the edge, log a warning, keep compiling.
    #[default]
    Permissive,
    /// Fail the compile, listing every unresolved reference.
    Strict,
}

/// Compiler settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Version stamped on the output document.
    pub version: String,
    pub reference_policy: ReferencePolicy,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_GRAPH_VERSION.to_string(),
            reference_policy: ReferencePolicy::default(),
        }
    }
}

/// An inferred edge that was not emitted because its target is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedReference {
    pub source: String,
    pub target: String,
    pub relation: Relation,
}

impl std::fmt::Display for DroppedReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.relation, self.target)
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{} reference(s) point at unknown nodes{}", .0.len(), first_dropped(.0))]
    DanglingReferences(Vec<DroppedReference>),
}

fn first_dropped(dropped: &[DroppedReference]) -> String {
    dropped
        .first()
        .map(|reference| format!(" (first: {})", reference))
        .unwrap_or_default()
}

/// Everything a compile pass produces.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub graph: GraphModel,
    /// Records skipped because they were missing a name/id or collided with
    /// an earlier node id.
    pub rejected: Vec<RejectedRecord>,
    /// References that did not become edges.
    pub dropped: Vec<DroppedReference>,
}

/// Compiles spec records into a `GraphModel`.
#[derive(Debug, Clone, Default)]
pub struct GraphCompiler {
    options: CompileOptions,
}

impl GraphCompiler {
    /// Creates a compiler with default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles `specs` into a fresh graph document.
    ///
    /// Malformed records are skipped and reported in the output. Under the
    /// strict reference policy any unresolved reference fails the compile.
    pub fn compile(&self, specs: &SpecBundle) -> Result<CompileOutput, CompileError> {
        let mut pass = CompilePass::default();

        // Pass 1: nodes
        for (index, entity) in specs.entities.iter().enumerate() {
            pass.add_entity(index, entity);
        }
        for (index, algorithm) in specs.algorithms.iter().enumerate() {
            pass.add_algorithm(index, algorithm);
        }
        for (index, workflow) in specs.workflows.iter().enumerate() {
            pass.add_workflow(index, workflow);
        }
        for (index, skill) in specs.skills.iter().enumerate() {
            pass.add_skill(index, skill);
        }

        // Pass 2: edges
        pass.resolve_references(specs);
        pass.resolve_data_flow(specs);

        let CompilePass {
            nodes,
            edges,
            rejected,
            dropped,
            ..
        } = pass;

        if !dropped.is_empty() {
            match self.options.reference_policy {
                ReferencePolicy::Strict => return Err(CompileError::DanglingReferences(dropped)),
                ReferencePolicy::Permissive => {
                    for reference in &dropped {
                        warn!("Dropped reference to unknown node: {}", reference);
                    }
                }
            }
        }

        debug!(
            "Compiled graph: {} nodes, {} edges, {} rejected, {} dropped",
            nodes.len(),
            edges.len(),
            rejected.len(),
            dropped.len()
        );

        Ok(CompileOutput {
            graph: GraphModel::new(self.options.version.clone(), nodes, edges),
            rejected,
            dropped,
        })
    }
}

/// Working state for one compile.
#[derive(Default)]
struct CompilePass {
    nodes: Vec<Node>,
    node_ids: HashSet<String>,
    edges: Vec<Edge>,
    rejected: Vec<RejectedRecord>,
    dropped: Vec<DroppedReference>,
    /// Indexes of entities that became nodes; only these contribute edges.
    accepted_entities: HashSet<usize>,
    accepted_workflows: HashSet<usize>,
}

impl CompilePass {
    /// Adds a node unless its id is taken. Returns whether it was added.
    ///
    /// `index` is the record's position in its collection file.
    fn push_node(&mut self, kind: SpecKind, index: usize, node: Node) -> bool {
        if self.node_ids.contains(&node.id) {
            warn!("Skipping {} #{}: duplicate node id {}", kind, index, node.id);
            self.rejected.push(RejectedRecord::new(
                kind,
                index,
                format!("duplicate node id {}", node.id),
            ));
            return false;
        }
        self.node_ids.insert(node.id.clone());
        self.nodes.push(node);
        true
    }

    fn reject(&mut self, kind: SpecKind, index: usize, reason: &str) {
        warn!("Skipping {} #{}: {}", kind, index, reason);
        self.rejected.push(RejectedRecord::new(kind, index, reason));
    }

    fn add_entity(&mut self, index: usize, entity: &EntitySpec) {
        let position = entity.source_index.unwrap_or(index);
        let Some(name) = entity.name() else {
            self.reject(SpecKind::Entity, position, "missing name");
            return;
        };
        let lower = name.to_lowercase();

        let mut metadata = NodeMetadata::new(
            entity.owner.as_deref().unwrap_or(DEFAULT_OWNER),
            entity.criticality.as_deref().unwrap_or(DEFAULT_CRITICALITY),
        );
        metadata.fields_count = Some(entity.fields.len());

        let node = Node::new(entity_node_id(name), NodeType::Asset, name)
            .with_metadata(metadata)
            .with_status_source(format!("hook.entity.{}_status", lower));

        if self.push_node(SpecKind::Entity, position, node) {
            self.accepted_entities.insert(index);
        }
    }

    fn add_algorithm(&mut self, index: usize, algorithm: &AlgorithmSpec) {
        let position = algorithm.source_index.unwrap_or(index);
        let Some(key) = algorithm.key() else {
            self.reject(SpecKind::Algorithm, position, "missing id and name");
            return;
        };
        let label = algorithm.name.as_deref().unwrap_or(key);

        let metadata = NodeMetadata::new(
            algorithm.owner.as_deref().unwrap_or(DEFAULT_OWNER),
            algorithm
                .criticality
                .as_deref()
                .unwrap_or(DEFAULT_CRITICALITY),
        );
        let node =
            Node::new(algorithm_node_id(key), NodeType::Algorithm, label).with_metadata(metadata);
        self.push_node(SpecKind::Algorithm, position, node);
    }

    fn add_workflow(&mut self, index: usize, workflow: &WorkflowSpec) {
        let position = workflow.source_index.unwrap_or(index);
        let Some(key) = workflow.key() else {
            self.reject(SpecKind::Workflow, position, "missing id and name");
            return;
        };
        let label = workflow.name.as_deref().unwrap_or(key);

        let mut metadata = NodeMetadata::new(
            workflow.owner.as_deref().unwrap_or(DEFAULT_OWNER),
            workflow
                .criticality
                .as_deref()
                .unwrap_or(DEFAULT_WORKFLOW_CRITICALITY),
        );
        metadata.sla = Some(workflow.sla.as_deref().unwrap_or(DEFAULT_SLA).to_string());

        let node =
            Node::new(workflow_node_id(key), NodeType::Workflow, label).with_metadata(metadata);
        if self.push_node(SpecKind::Workflow, position, node) {
            self.accepted_workflows.insert(index);
        }
    }

    fn add_skill(&mut self, index: usize, skill: &SkillSpec) {
        let position = skill.source_index.unwrap_or(index);
        let Some(key) = skill.key() else {
            self.reject(SpecKind::Skill, position, "missing id and name");
            return;
        };
        let label = skill.name.as_deref().unwrap_or(key);

        let node = Node::new(skill_node_id(key), NodeType::Skill, label)
            .with_metadata(NodeMetadata::new(SKILL_OWNER, DEFAULT_CRITICALITY));
        self.push_node(SpecKind::Skill, position, node);
    }

    /// Emits `edge` if its target exists, otherwise records it as dropped.
    fn link(&mut self, edge: Edge) {
        if self.node_ids.contains(&edge.target) {
            self.edges.push(edge);
        } else {
            self.dropped.push(DroppedReference {
                source: edge.source,
                target: edge.target,
                relation: edge.relation,
            });
        }
    }

    /// Structural references: entity field → referenced entity.
    fn resolve_references(&mut self, specs: &SpecBundle) {
        for (index, entity) in specs.entities.iter().enumerate() {
            if !self.accepted_entities.contains(&index) {
                continue;
            }
            let Some(name) = entity.name() else {
                continue;
            };
            let source = entity_node_id(name);

            for field in &entity.fields {
                if let Some(target) = field.reference_target() {
                    let target = target.to_lowercase();
                    self.link(Edge::new(
                        source.clone(),
                        entity_node_id(&target),
                        Relation::DependsOn,
                        format!("{} references {}", field.name, target),
                    ));
                }
            }
        }
    }

    /// Workflow data flow: workflow → produced/consumed entity.
    fn resolve_data_flow(&mut self, specs: &SpecBundle) {
        for (index, workflow) in specs.workflows.iter().enumerate() {
            if !self.accepted_workflows.contains(&index) {
                continue;
            }
            let Some(key) = workflow.key() else {
                continue;
            };
            let source = workflow_node_id(key);

            for produced in &workflow.produces {
                self.link(Edge::new(
                    source.clone(),
                    entity_node_id(produced),
                    Relation::Produces,
                    format!("Workflow produces {}", produced),
                ));
            }
            for consumed in &workflow.consumes {
                self.link(Edge::new(
                    source.clone(),
                    entity_node_id(consumed),
                    Relation::Consumes,
                    format!("Workflow consumes {}", consumed),
                ));
            }
        }
    }
}
