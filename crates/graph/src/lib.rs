//! `graph` is the Dependency Graph Service (spec §4.1, C6): it builds the
//! inter-entity DAG implied by a project's foreign keys, `derived` sources,
//! and explicit `depends_on`, detects cycles, computes a deterministic
//! topological order and per-entity depths, and exposes the source-level
//! lineage down to physical tables and files.
//!
//! This crate never touches row data -- it works purely off `model::Project`
//! -- so it is cheap to call repeatedly (e.g. on every project edit in an
//! editor) without materializing anything.

mod build;
mod cycles;
mod lineage;
mod model;
mod sql_extract;
mod topo;

pub use crate::model::{DependencyGraph, Edge, Node, NodeKind, SourceEdge, SourceNode};
pub use build::build;
pub use cycles::Cycle;
pub use sql_extract::extract_table_names;

use ::model::{EntityName, Project};

/// Entity names referenced as an FK target, `derived` source, or explicit
/// `depends_on` entry that do not exist in `project.entities`. The graph
/// still builds around these (the dangling edge is simply omitted, per
/// spec §4.1's failure semantics); callers that need to surface the
/// corresponding `MISSING_PARENT` validation issue should call this
/// alongside [`build`].
pub fn missing_parents(project: &Project) -> Vec<(EntityName, EntityName)> {
    let mut missing = Vec::new();
    for (name, entity) in &project.entities {
        for dep in entity.static_dependencies() {
            if !project.entities.contains_key(&dep) {
                missing.push((name.clone(), dep));
            }
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::model::{Entity, Options};
    use std::collections::BTreeMap;

    #[test]
    fn flags_missing_parent() {
        let mut child: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: child_id\nvalues: []\ndepends_on: [ghost]\n",
        )
        .unwrap();
        child.depends_on = vec![EntityName::new("ghost")];

        let mut entities = BTreeMap::new();
        entities.insert(EntityName::new("child"), child);

        let project = Project {
            name: "t".into(),
            version: 1,
            data_sources: BTreeMap::new(),
            entities,
            options: Options::default(),
            task_list: None,
            reconciliation: None,
        };

        let missing = missing_parents(&project);
        assert_eq!(missing, vec![(EntityName::new("child"), EntityName::new("ghost"))]);

        let graph = build(&project);
        assert!(graph.nodes.contains_key(&EntityName::new("child")));
        assert!(graph.edges.is_empty());
    }
}
