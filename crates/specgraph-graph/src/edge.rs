//! Edge types for the business graph.
//!
//! Edges are directed and typed. We keep the set of relations to the three
//! the compiler can actually infer from specs.

use serde::{Deserialize, Serialize};

/// The type of relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Entity A holds an identifier reference to entity B.
    DependsOn,

    /// Workflow writes the entity.
    Produces,

    /// Workflow reads the entity.
    Consumes,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "DEPENDS_ON",
            Self::Produces => "PRODUCES",
            Self::Consumes => "CONSUMES",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge in the business graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the node the edge starts at.
    pub source: String,

    /// Id of the node the edge points to.
    pub target: String,

    pub relation: Relation,

    /// Human-readable reason for the edge.
    pub semantics: String,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: Relation,
        semantics: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            semantics: semantics.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_wire_names() {
        let edge = Edge::new("a", "b", Relation::DependsOn, "a references b");
        let json = serde_json::to_value(&edge).unwrap();
        assert_eq!(json["relation"], "DEPENDS_ON");
        assert_eq!(Relation::Consumes.to_string(), "CONSUMES");

        let back: Relation = serde_json::from_str("\"PRODUCES\"").unwrap();
        assert_eq!(back, Relation::Produces);
    }
}
