//! Spec record types.
//!
//! These mirror the JSON records kept in the spec store. Every field that a
//! record may omit is optional here; whether a record is usable is decided
//! by the consumer (the compiler or the dependency index), which rejects
//! records individually instead of failing the whole batch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field type that marks an identifier reference to another entity.
pub const REFERENCE_FIELD_TYPE: &str = "uuid";

/// Returns the first non-empty value among `candidates`.
fn first_present<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

/// A domain entity declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub criticality: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default)]
    pub relationships: Vec<RelationshipSpec>,

    /// Position in the collection file, set by the spec store.
    #[serde(skip)]
    pub source_index: Option<usize>,
}

impl EntitySpec {
    /// Creates an entity with the given id and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Builder: add a field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Builder: add a relationship to another entity id.
    pub fn with_relationship(mut self, relationship: RelationshipSpec) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// The entity's name, if present and non-empty.
    pub fn name(&self) -> Option<&str> {
        first_present([self.name.as_deref()])
    }

    /// The entity's id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        first_present([self.id.as_deref()])
    }
}

/// One field of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: String,

    /// Name of the entity this field points at.
    #[serde(default)]
    pub references: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            references: None,
        }
    }

    /// Creates an identifier-reference field pointing at `entity`.
    pub fn reference(name: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: REFERENCE_FIELD_TYPE.to_string(),
            references: Some(entity.into()),
        }
    }

    /// Returns the referenced entity name when this field is an identifier
    /// reference with a non-empty target.
    pub fn reference_target(&self) -> Option<&str> {
        if self.kind != REFERENCE_FIELD_TYPE {
            return None;
        }
        first_present([self.references.as_deref()])
    }
}

/// A declared entity-to-entity relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    /// Id of the target entity.
    #[serde(rename = "targetEntity")]
    pub target_entity: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub required: bool,
}

impl RelationshipSpec {
    pub fn new(target_entity: impl Into<String>) -> Self {
        Self {
            target_entity: target_entity.into(),
            kind: None,
            required: false,
        }
    }

    /// Builder: mark the relationship as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A workflow declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub criticality: Option<String>,

    #[serde(default)]
    pub sla: Option<String>,

    /// Entity names this workflow writes.
    #[serde(default)]
    pub produces: Vec<String>,

    /// Entity names this workflow reads.
    #[serde(default)]
    pub consumes: Vec<String>,

    /// Position in the collection file, set by the spec store.
    #[serde(skip)]
    pub source_index: Option<usize>,
}

impl WorkflowSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// The id used to derive the node id: `id`, falling back to `name`.
    pub fn key(&self) -> Option<&str> {
        first_present([self.id.as_deref(), self.name.as_deref()])
    }
}

/// An algorithm declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpec {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub criticality: Option<String>,

    /// Position in the collection file, set by the spec store.
    #[serde(skip)]
    pub source_index: Option<usize>,
}

impl AlgorithmSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// The id used to derive the node id: `id`, falling back to `name`.
    pub fn key(&self) -> Option<&str> {
        first_present([self.id.as_deref(), self.name.as_deref()])
    }
}

/// An agent skill declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSpec {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Position in the collection file, set by the spec store.
    #[serde(skip)]
    pub source_index: Option<usize>,
}

impl SkillSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn key(&self) -> Option<&str> {
        first_present([self.id.as_deref(), self.name.as_deref()])
    }
}

/// A record that remembers where it sat in its collection file, so reports
/// about it stay accurate after malformed neighbours are dropped.
pub trait SourceIndexed {
    fn source_index(&self) -> Option<usize>;

    fn set_source_index(&mut self, index: usize);
}

macro_rules! impl_source_indexed {
    ($($spec:ty),*) => {
        $(
            impl SourceIndexed for $spec {
                fn source_index(&self) -> Option<usize> {
                    self.source_index
                }

                fn set_source_index(&mut self, index: usize) {
                    self.source_index = Some(index);
                }
            }
        )*
    };
}

impl_source_indexed!(EntitySpec, WorkflowSpec, AlgorithmSpec, SkillSpec);

/// Every record collection the compiler and the dependency index consume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecBundle {
    pub entities: Vec<EntitySpec>,
    pub algorithms: Vec<AlgorithmSpec>,
    pub workflows: Vec<WorkflowSpec>,
    pub skills: Vec<SkillSpec>,
}

/// The collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    Entity,
    Algorithm,
    Workflow,
    Skill,
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Entity => "entity",
            Self::Algorithm => "algorithm",
            Self::Workflow => "workflow",
            Self::Skill => "skill",
        };
        write!(f, "{}", s)
    }
}

/// A record that was skipped because it was malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub kind: SpecKind,

    /// Position of the record within its collection.
    pub index: usize,

    pub reason: String,
}

impl RejectedRecord {
    pub fn new(kind: SpecKind, index: usize, reason: impl Into<String>) -> Self {
        Self {
            kind,
            index,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RejectedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: {}", self.kind, self.index, self.reason)
    }
}
