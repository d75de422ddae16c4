//! Entity dependency index for change planning.
//!
//! The index answers "what breaks if I change this?" and "what must be
//! changed first?" from the entity-to-entity relationships declared in the
//! specs. It is built fresh for each planning session and never persisted.
//!
//! Every traversal is guarded by a visited set, so relationship cycles
//! degrade to well-defined results instead of errors:
//! - closures terminate and never contain the starting id
//! - `get_change_order` falls back to the input order

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use specgraph_core::{EntitySpec, SpecBundle};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Largest impact set still rated low risk (the entity alone).
pub const LOW_RISK_MAX_IMPACT: usize = 1;

/// Largest impact set still rated medium risk.
pub const MEDIUM_RISK_MAX_IMPACT: usize = 3;

/// Risk of changing an entity, rated by the size of its impact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeRisk {
    Low,
    Medium,
    High,
    /// The entity is not in the index.
    Unknown,
}

impl ChangeRisk {
    /// Rates an impact set of `size` entities.
    ///
    /// Thresholds: 1 = low, 2-3 = medium, 4+ = high.
    pub fn from_impact_size(size: usize) -> Self {
        if size <= LOW_RISK_MAX_IMPACT {
            ChangeRisk::Low
        } else if size <= MEDIUM_RISK_MAX_IMPACT {
            ChangeRisk::Medium
        } else {
            ChangeRisk::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeRisk::Low => "low",
            ChangeRisk::Medium => "medium",
            ChangeRisk::High => "high",
            ChangeRisk::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChangeRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entity and its direct relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDependencyNode {
    pub id: String,
    pub name: String,
    /// Entities this one depends on.
    pub dependencies: BTreeSet<String>,
    /// Entities that depend on this one.
    pub dependents: BTreeSet<String>,
}

/// Summary of an entity's place in the dependency structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    pub name: String,
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
    pub all_dependencies: Vec<String>,
    pub all_dependents: Vec<String>,
    pub total_impact: usize,
}

/// Bidirectional adjacency over declared entity relationships.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    nodes: HashMap<String, EntityDependencyNode>,
    /// Entity ids in declaration order.
    order: Vec<String>,
}

impl DependencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from the entities of a spec bundle.
    pub fn from_specs(specs: &SpecBundle) -> Self {
        Self::from_entities(&specs.entities)
    }

    /// Builds the index from entity records.
    ///
    /// Pass 1 registers the first entity declared under each id; pass 2
    /// links the relationships of those entities whose targets are registered.
    pub fn from_entities(entities: &[EntitySpec]) -> Self {
        let mut index = Self::new();
        let mut registered = Vec::new();

        for (position, entity) in entities.iter().enumerate() {
            let Some(id) = entity.id() else {
                warn!("Entity #{} has no id, leaving it out of the dependency index", position);
                continue;
            };
            if index.nodes.contains_key(id) {
                warn!("Entity id {} declared more than once", id);
                continue;
            }
            registered.push(position);
            index.order.push(id.to_string());
            index.nodes.insert(
                id.to_string(),
                EntityDependencyNode {
                    id: id.to_string(),
                    name: entity.name().unwrap_or(id).to_string(),
                    dependencies: BTreeSet::new(),
                    dependents: BTreeSet::new(),
                },
            );
        }

        // Only registered declarations contribute; later duplicates are ignored.
        for entity in registered.iter().filter_map(|&position| entities.get(position)) {
            let Some(id) = entity.id() else {
                continue;
            };
            for relationship in &entity.relationships {
                index.link(id, &relationship.target_entity);
            }
        }

        debug!("Built dependency index over {} entities", index.len());
        index
    }

    /// Records that `from` depends on `to`, if both are known.
    fn link(&mut self, from: &str, to: &str) {
        if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
            debug!("Ignoring relationship {} -> {}: unknown entity", from, to);
            return;
        }
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependencies.insert(to.to_string());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.dependents.insert(from.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&EntityDependencyNode> {
        self.nodes.get(id)
    }

    /// Entity ids in declaration order.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Worklist closure from `id` over the adjacency chosen by `next`.
    ///
    /// Each node is expanded at most once; `id` itself is never included.
    fn closure<F>(&self, id: &str, next: F) -> BTreeSet<String>
    where
        F: Fn(&EntityDependencyNode) -> &BTreeSet<String>,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![id];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                for neighbor in next(node) {
                    if !visited.contains(neighbor.as_str()) {
                        stack.push(neighbor);
                    }
                }
            }
        }

        visited.remove(id);
        visited.into_iter().map(str::to_string).collect()
    }

    /// All entities `id` depends on, directly or transitively.
    pub fn get_dependencies(&self, id: &str) -> BTreeSet<String> {
        self.closure(id, |node| &node.dependencies)
    }

    /// All entities that depend on `id`, directly or transitively.
    pub fn get_dependents(&self, id: &str) -> BTreeSet<String> {
        self.closure(id, |node| &node.dependents)
    }

    /// The blast radius of changing `id`: itself plus all its dependents.
    pub fn get_impact(&self, id: &str) -> BTreeSet<String> {
        let mut impact = self.get_dependents(id);
        impact.insert(id.to_string());
        impact
    }

    /// True when changes to `a` and `b` touch disjoint impact sets.
    pub fn can_parallelize(&self, a: &str, b: &str) -> bool {
        let impact_a = self.get_impact(a);
        let impact_b = self.get_impact(b);
        impact_a.is_disjoint(&impact_b)
    }

    /// Returns the in-flight changes whose impact overlaps that of `id`,
    /// in their original order.
    pub fn find_conflicts<S: AsRef<str>>(&self, id: &str, in_flight: &[S]) -> Vec<String> {
        let impact = self.get_impact(id);
        in_flight
            .iter()
            .map(AsRef::as_ref)
            .filter(|other| !impact.is_disjoint(&self.get_impact(other)))
            .map(str::to_string)
            .collect()
    }

    /// Orders `ids` so every entity comes after the entities it depends on.
    ///
    /// Only relationships between members of `ids` count. Ties keep input
    /// order and a repeated id keeps its first position. Returns `None` when
    /// the members contain a cycle.
    pub fn try_change_order<S: AsRef<str>>(&self, ids: &[S]) -> Option<Vec<String>> {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut in_degree: HashMap<&str, usize> = ids.iter().map(|&id| (id, 0)).collect();
        let mut unlocks: HashMap<&str, Vec<&str>> = HashMap::new();

        for &id in &ids {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            for dependency in &node.dependencies {
                if in_degree.contains_key(dependency.as_str()) {
                    unlocks.entry(dependency.as_str()).or_default().push(id);
                    *in_degree.entry(id).or_default() += 1;
                }
            }
        }

        // Kahn's algorithm, FIFO
        let mut queue: VecDeque<&str> = ids
            .iter()
            .copied()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut ordered = Vec::with_capacity(ids.len());

        while let Some(current) = queue.pop_front() {
            ordered.push(current.to_string());
            if let Some(next) = unlocks.get(current) {
                for &dependent in next {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if ordered.len() == ids.len() {
            Some(ordered)
        } else {
            None
        }
    }

    /// Like [`try_change_order`](Self::try_change_order), but returns `ids`
    /// unchanged when no safe order exists.
    ///
    /// An unchanged result is not a guarantee of safety: when it matters,
    /// use `try_change_order` or check [`find_cycles`](Self::find_cycles).
    pub fn get_change_order<S: AsRef<str>>(&self, ids: &[S]) -> Vec<String> {
        match self.try_change_order(ids) {
            Some(ordered) => ordered,
            None => {
                warn!("Dependency cycle among requested changes; keeping input order");
                ids.iter().map(|id| id.as_ref().to_string()).collect()
            }
        }
    }

    /// Rates the risk of changing `id`.
    pub fn analyze_change_risk(&self, id: &str) -> ChangeRisk {
        if !self.contains(id) {
            return ChangeRisk::Unknown;
        }
        ChangeRisk::from_impact_size(self.get_impact(id).len())
    }

    /// Direct and transitive relationships of `id`.
    pub fn get_entity_info(&self, id: &str) -> Option<EntityInfo> {
        let node = self.nodes.get(id)?;
        Some(EntityInfo {
            id: node.id.clone(),
            name: node.name.clone(),
            depends_on: node.dependencies.iter().cloned().collect(),
            depended_by: node.dependents.iter().cloned().collect(),
            all_dependencies: self.get_dependencies(id).into_iter().collect(),
            all_dependents: self.get_dependents(id).into_iter().collect(),
            total_impact: self.get_impact(id).len(),
        })
    }

    /// Groups of entities that depend on each other in a cycle.
    ///
    /// Each group is sorted, and groups are sorted by their first member.
    /// A self-relationship is reported as a group of one.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut indexes = HashMap::new();
        for id in &self.order {
            indexes.insert(id.as_str(), graph.add_node(id.as_str()));
        }
        for id in &self.order {
            let (Some(&from), Some(node)) = (indexes.get(id.as_str()), self.nodes.get(id)) else {
                continue;
            };
            for dependency in &node.dependencies {
                if let Some(&to) = indexes.get(dependency.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .map(|&idx| graph.contains_edge(idx, idx))
                        .unwrap_or(false)
            })
            .map(|component| {
                let mut members: Vec<String> =
                    component.into_iter().map(|idx| graph[idx].to_string()).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Renders the index as a Mermaid `graph TD` diagram.
    pub fn visualize_mermaid(&self) -> String {
        let mut lines = vec!["graph TD".to_string()];
        for id in &self.order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            lines.push(format!("    {}[{}]", node.id, node.name));
            for dependency in &node.dependencies {
                lines.push(format!("    {} --> {}", dependency, node.id));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specgraph_core::RelationshipSpec;

    fn entity(id: &str, depends_on: &[&str]) -> EntitySpec {
        depends_on.iter().fold(EntitySpec::new(id, id), |e, target| {
            e.with_relationship(RelationshipSpec::new(*target))
        })
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn order_customer() -> DependencyIndex {
        DependencyIndex::from_entities(&[
            EntitySpec::new("order", "Order")
                .with_relationship(RelationshipSpec::new("customer").required()),
            EntitySpec::new("customer", "Customer"),
        ])
    }

    fn cycle() -> DependencyIndex {
        DependencyIndex::from_entities(&[
            entity("A", &["B"]),
            entity("B", &["C"]),
            entity("C", &["A"]),
        ])
    }

    #[test]
    fn test_order_customer_scenario() {
        let index = order_customer();

        assert_eq!(index.get_dependencies("order"), set(&["customer"]));
        assert_eq!(index.get_dependents("customer"), set(&["order"]));
        assert_eq!(index.get_impact("customer"), set(&["customer", "order"]));
        assert!(!index.can_parallelize("order", "customer"));
        assert_eq!(
            index.get_change_order(&["order", "customer"]),
            vec!["customer", "order"]
        );
    }

    #[test]
    fn test_cycle_terminates_and_excludes_self() {
        let index = cycle();

        assert_eq!(index.get_dependencies("A"), set(&["B", "C"]));
        assert_eq!(index.get_dependents("A"), set(&["B", "C"]));
        assert_eq!(index.get_change_order(&["A", "B", "C"]), vec!["A", "B", "C"]);
        assert_eq!(index.try_change_order(&["A", "B", "C"]), None);
    }

    #[test]
    fn test_unknown_ids_have_no_relationships() {
        let index = order_customer();

        assert!(index.get_dependencies("ghost").is_empty());
        assert!(index.get_dependents("ghost").is_empty());
        assert_eq!(index.get_impact("ghost"), set(&["ghost"]));
        assert!(index.can_parallelize("ghost", "order"));
        assert_eq!(index.analyze_change_risk("ghost"), ChangeRisk::Unknown);
        assert!(index.get_entity_info("ghost").is_none());
    }

    #[test]
    fn test_relationships_to_unknown_entities_are_ignored() {
        let index = DependencyIndex::from_entities(&[entity("a", &["missing"])]);
        assert!(index.get_dependencies("a").is_empty());
        assert!(!index.contains("missing"));
    }

    #[test]
    fn test_parallelize_is_symmetric_and_never_self() {
        let index = DependencyIndex::from_entities(&[
            entity("a", &["b"]),
            entity("b", &[]),
            entity("c", &[]),
        ]);

        for x in ["a", "b", "c", "zz"] {
            assert!(!index.can_parallelize(x, x));
            for y in ["a", "b", "c", "zz"] {
                assert_eq!(index.can_parallelize(x, y), index.can_parallelize(y, x));
            }
        }
        assert!(index.can_parallelize("a", "c"));
    }

    #[test]
    fn test_find_conflicts_preserves_input_order() {
        let index = DependencyIndex::from_entities(&[
            entity("line", &["order"]),
            entity("order", &["customer"]),
            entity("customer", &[]),
            entity("product", &[]),
        ]);

        let conflicts = index.find_conflicts("customer", &["product", "line", "order"]);
        assert_eq!(conflicts, vec!["line", "order"]);

        let none: Vec<String> = Vec::new();
        assert!(index.find_conflicts("product", &none).is_empty());
    }

    #[test]
    fn test_change_order_ties_keep_input_order() {
        // c depends on a and b; a and b are independent.
        let index = DependencyIndex::from_entities(&[
            entity("a", &[]),
            entity("b", &[]),
            entity("c", &["a", "b"]),
        ]);

        assert_eq!(index.get_change_order(&["c", "b", "a"]), vec!["b", "a", "c"]);
        assert_eq!(index.get_change_order(&["a", "c", "b"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_change_order_only_counts_induced_edges() {
        // a -> b -> c, but b is not part of the change set.
        let index = DependencyIndex::from_entities(&[
            entity("a", &["b"]),
            entity("b", &["c"]),
            entity("c", &[]),
        ]);

        assert_eq!(index.get_change_order(&["a", "c"]), vec!["a", "c"]);
        assert_eq!(index.get_change_order(&["a", "b", "c"]), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_change_order_with_unknown_ids() {
        let index = order_customer();
        assert_eq!(
            index.get_change_order(&["ghost", "order", "customer"]),
            vec!["ghost", "customer", "order"]
        );
    }

    #[test]
    fn test_change_order_with_repeated_ids() {
        let index = order_customer();
        assert_eq!(
            index.try_change_order(&["order", "customer", "order"]),
            Some(vec!["customer".to_string(), "order".to_string()])
        );
        assert_eq!(
            index.get_change_order(&["order", "order"]),
            vec!["order"]
        );
    }

    #[test]
    fn test_duplicate_declaration_adds_no_relationships() {
        let index = DependencyIndex::from_entities(&[
            entity("order", &[]),
            entity("customer", &[]),
            entity("order", &["customer"]),
        ]);

        assert_eq!(index.len(), 2);
        assert!(index.get_dependencies("order").is_empty());
        assert!(index.get_dependents("customer").is_empty());
    }

    #[test]
    fn test_change_risk_thresholds() {
        assert_eq!(ChangeRisk::from_impact_size(1), ChangeRisk::Low);
        assert_eq!(ChangeRisk::from_impact_size(2), ChangeRisk::Medium);
        assert_eq!(ChangeRisk::from_impact_size(3), ChangeRisk::Medium);
        assert_eq!(ChangeRisk::from_impact_size(4), ChangeRisk::High);

        let index = DependencyIndex::from_entities(&[
            entity("root", &[]),
            entity("a", &["root"]),
            entity("b", &["a"]),
            entity("c", &["b"]),
        ]);
        assert_eq!(index.analyze_change_risk("c"), ChangeRisk::Low);
        assert_eq!(index.analyze_change_risk("b"), ChangeRisk::Medium);
        assert_eq!(index.analyze_change_risk("a"), ChangeRisk::Medium);
        assert_eq!(index.analyze_change_risk("root"), ChangeRisk::High);
    }

    #[test]
    fn test_self_relationship_is_not_its_own_dependency() {
        let index = DependencyIndex::from_entities(&[entity("loop", &["loop"])]);

        assert!(index.get_dependencies("loop").is_empty());
        assert!(index.get_dependents("loop").is_empty());
        assert_eq!(index.get_impact("loop"), set(&["loop"]));
        assert_eq!(index.find_cycles(), vec![vec!["loop".to_string()]]);
    }

    #[test]
    fn test_find_cycles() {
        assert_eq!(cycle().find_cycles(), vec![vec!["A", "B", "C"]]);
        assert!(order_customer().find_cycles().is_empty());
    }

    #[test]
    fn test_entity_info() {
        let index = order_customer();
        let info = index.get_entity_info("customer").unwrap();

        assert_eq!(info.name, "Customer");
        assert!(info.depends_on.is_empty());
        assert_eq!(info.depended_by, vec!["order"]);
        assert_eq!(info.all_dependents, vec!["order"]);
        assert_eq!(info.total_impact, 2);
    }

    #[test]
    fn test_mermaid() {
        let diagram = order_customer().visualize_mermaid();
        assert_eq!(
            diagram,
            "graph TD\n    order[Order]\n    customer --> order\n    customer[Customer]"
        );
    }

    #[test]
    fn test_entities_without_id_are_skipped() {
        let mut nameless = EntitySpec::default();
        nameless.name = Some("Orphan".to_string());
        let index = DependencyIndex::from_entities(&[nameless, entity("a", &[])]);

        assert_eq!(index.len(), 1);
        assert_eq!(index.entity_ids().collect::<Vec<_>>(), vec!["a"]);
    }
}
