use indexmap::IndexMap;
use model::{DataSourceName, EntityName};
use serde::Serialize;

use crate::cycles::Cycle;

/// A node's declared or derived shape kind, carried alongside the graph so
/// consumers don't need a second lookup into the project to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Sql,
    Csv,
    Xlsx,
    Fixed,
    Derived,
}

/// One entity's position in the dependency graph. Deliberately holds no
/// back-pointers to dependents: those are reconstructed as a separate
/// adjacency index (`DependencyGraph::dependents`) rather than stored inline,
/// since the same node can be visited from many call sites.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Longest dependency chain beneath this entity. `0` for roots.
    pub depth: usize,
    pub depends_on: Vec<EntityName>,
}

/// A labeled edge between two entities.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub from: EntityName,
    pub to: EntityName,
    pub label: &'static str,
}

/// A node in the source-level lineage subgraph: either an entity, or one of
/// the physical things an entity is materialized from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceNode {
    Entity(EntityName),
    Table { data_source: DataSourceName, table: String },
    File { path: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEdge {
    pub from: SourceNode,
    pub to: SourceNode,
}

/// The full dependency graph of a project: every entity's declared shape and
/// static dependencies (spec §4.1), the cycles found within it, a
/// topological order when acyclic, and a source-level lineage view down to
/// physical tables and files.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub nodes: IndexMap<EntityName, Node>,
    pub edges: Vec<Edge>,
    pub cycles: Vec<Cycle>,
    pub topo_order: Option<Vec<EntityName>>,
    pub source_nodes: Vec<SourceNode>,
    pub source_edges: Vec<SourceEdge>,
}

impl DependencyGraph {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn depth_of(&self, entity: &EntityName) -> Option<usize> {
        self.nodes.get(entity).map(|n| n.depth)
    }

    /// Entities with no dependencies of their own.
    pub fn roots(&self) -> Vec<&EntityName> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.depends_on.is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Entities that `entity`'s removal would orphan: nothing else in the
    /// project depends on it, directly or transitively, and it is not a
    /// project root consumed externally.
    pub fn dependents_of(&self, entity: &EntityName) -> Vec<&EntityName> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.depends_on.contains(entity))
            .map(|(name, _)| name)
            .collect()
    }
}
