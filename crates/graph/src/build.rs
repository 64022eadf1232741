use indexmap::{IndexMap, IndexSet};
use model::{Entity, EntityName, Kind, Project};

use crate::cycles::{self, Cycle};
use crate::lineage;
use crate::model::{DependencyGraph, Edge, Node, NodeKind};
use crate::topo;

fn node_kind(kind: Kind) -> NodeKind {
    match kind {
        Kind::Sql => NodeKind::Sql,
        Kind::Csv => NodeKind::Csv,
        Kind::Xlsx => NodeKind::Xlsx,
        Kind::Fixed => NodeKind::Fixed,
        Kind::Derived => NodeKind::Derived,
    }
}

/// Builds the full [`DependencyGraph`] for `project`: one node per entity,
/// edges from child to parent, cycle detection, a topological order (when
/// acyclic), and the source-level lineage subgraph (spec §4.1).
///
/// Dangling references -- an FK, `source`, or `depends_on` entry naming an
/// entity that does not exist in the project -- are silently dropped from
/// the dependency closure here. They are not a construction failure; the
/// node is still emitted. Surfacing them as `MISSING_PARENT` validation
/// issues is the Validation Engine's job, not this one's (spec §4.1).
pub fn build(project: &Project) -> DependencyGraph {
    let mut deps_by_name: IndexMap<EntityName, Vec<EntityName>> = IndexMap::new();
    let mut nodes: IndexMap<EntityName, Node> = IndexMap::new();
    let mut edges: Vec<Edge> = Vec::new();

    for (name, entity) in &project.entities {
        let deps = entity.static_dependencies();
        edges.extend(edges_for(name, entity, &deps));
        deps_by_name.insert(name.clone(), deps.clone());
        nodes.insert(
            name.clone(),
            Node {
                kind: node_kind(entity.kind),
                depth: 0,
                depends_on: deps,
            },
        );
    }

    let cycles: Vec<Cycle> = cycles::detect_cycles(&deps_by_name);
    let topo_order = if cycles.is_empty() {
        topo::topological_order(&deps_by_name)
    } else {
        None
    };

    assign_depths(&mut nodes, &cycles);

    let (source_nodes, source_edges) = lineage::build_source_lineage(project);

    DependencyGraph {
        nodes,
        edges,
        cycles,
        topo_order,
        source_nodes,
        source_edges,
    }
}

fn edges_for(name: &EntityName, entity: &Entity, deps: &[EntityName]) -> Vec<Edge> {
    let mut out = Vec::new();
    for fk in &entity.foreign_keys {
        out.push(Edge {
            from: name.clone(),
            to: fk.entity.clone(),
            label: "references",
        });
    }
    if entity.kind == Kind::Derived {
        if let Some(source) = &entity.source {
            out.push(Edge {
                from: name.clone(),
                to: source.clone(),
                label: "derived_from",
            });
        }
    }
    let fk_and_source_count = entity.foreign_keys.len()
        + usize::from(entity.kind == Kind::Derived && entity.source.is_some());
    for dep in deps.iter().skip(fk_and_source_count) {
        out.push(Edge {
            from: name.clone(),
            to: dep.clone(),
            label: "depends_on",
        });
    }
    out
}

/// Longest path from each node down to a root, memoized with a visited set
/// to avoid exponential blowup on diamond-shaped dependency graphs. When the
/// project contains cycles (so depth is undefined for members of the cycle
/// and anything downstream), a conservative fallback is used instead: `0` if
/// the node has no dependencies, `1` otherwise (spec §4.1 Design Note).
fn assign_depths(nodes: &mut IndexMap<EntityName, Node>, cycles: &[Cycle]) {
    if !cycles.is_empty() {
        for node in nodes.values_mut() {
            node.depth = usize::from(!node.depends_on.is_empty());
        }
        return;
    }

    let deps_by_name: IndexMap<EntityName, Vec<EntityName>> = nodes
        .iter()
        .map(|(name, node)| (name.clone(), node.depends_on.clone()))
        .collect();

    let mut memo: IndexMap<EntityName, usize> = IndexMap::new();
    let names: Vec<EntityName> = nodes.keys().cloned().collect();
    for name in &names {
        depth_of(name, &deps_by_name, &mut memo, &mut IndexSet::new());
    }

    for (name, node) in nodes.iter_mut() {
        node.depth = memo.get(name).copied().unwrap_or(0);
    }
}

fn depth_of(
    name: &EntityName,
    deps_by_name: &IndexMap<EntityName, Vec<EntityName>>,
    memo: &mut IndexMap<EntityName, usize>,
    in_progress: &mut IndexSet<EntityName>,
) -> usize {
    if let Some(d) = memo.get(name) {
        return *d;
    }
    if !in_progress.insert(name.clone()) {
        // Should be unreachable once `cycles` is empty, but guards against
        // runaway recursion if that invariant is ever violated.
        return 0;
    }

    let deps = deps_by_name.get(name).cloned().unwrap_or_default();
    let depth = deps
        .iter()
        .filter(|d| deps_by_name.contains_key(*d))
        .map(|d| 1 + depth_of(d, deps_by_name, memo, in_progress))
        .max()
        .unwrap_or(0);

    in_progress.shift_remove(name);
    memo.insert(name.clone(), depth);
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fixed_entity(public_id: &str) -> Entity {
        serde_yaml::from_str(&format!(
            "kind: fixed\npublic_id: {public_id}\nvalues: []\n"
        ))
        .unwrap()
    }

    #[test]
    fn builds_edges_from_foreign_keys() {
        let mut entities = BTreeMap::new();
        let mut child = fixed_entity("child_id");
        child.foreign_keys.push(model::ForeignKey {
            entity: EntityName::new("parent"),
            local_keys: vec![],
            remote_keys: vec![],
            how: model::How::Inner,
            constraints: model::Constraints::default(),
            extra_columns: vec![],
            drop_remote_id: false,
        });
        entities.insert(EntityName::new("child"), child);
        entities.insert(EntityName::new("parent"), fixed_entity("parent_id"));

        let project = Project {
            name: "t".into(),
            version: 1,
            data_sources: BTreeMap::new(),
            entities,
            options: model::Options::default(),
            task_list: None,
            reconciliation: None,
        };

        let graph = build(&project);
        assert!(!graph.has_cycles());
        assert_eq!(graph.depth_of(&EntityName::new("parent")), Some(0));
        assert_eq!(graph.depth_of(&EntityName::new("child")), Some(1));
        assert_eq!(
            graph.topo_order.unwrap(),
            vec![EntityName::new("parent"), EntityName::new("child")]
        );
        assert!(graph
            .edges
            .iter()
            .any(|e| e.from.as_str() == "child" && e.to.as_str() == "parent"));
    }

    #[test]
    fn reports_cycles_and_suppresses_topo_order() {
        let mut entities = BTreeMap::new();
        let mut a = fixed_entity("a_id");
        a.depends_on.push(EntityName::new("b"));
        let mut b = fixed_entity("b_id");
        b.depends_on.push(EntityName::new("a"));
        entities.insert(EntityName::new("a"), a);
        entities.insert(EntityName::new("b"), b);

        let project = Project {
            name: "t".into(),
            version: 1,
            data_sources: BTreeMap::new(),
            entities,
            options: model::Options::default(),
            task_list: None,
            reconciliation: None,
        };

        let graph = build(&project);
        assert!(graph.has_cycles());
        assert!(graph.topo_order.is_none());
        assert_eq!(graph.cycles.len(), 1);
    }
}
