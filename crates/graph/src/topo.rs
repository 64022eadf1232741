use indexmap::{IndexMap, IndexSet};
use model::EntityName;
use std::collections::BinaryHeap;

/// Kahn's algorithm, breaking ties on entity name so that the ordering is a
/// deterministic function of the project alone (spec §4.1, P2). Returns
/// `None` when the graph contains a cycle -- callers are expected to have
/// already run [`crate::cycles::detect_cycles`] and surfaced those
/// separately before falling back to this.
pub fn topological_order(
    nodes: &IndexMap<EntityName, Vec<EntityName>>,
) -> Option<Vec<EntityName>> {
    // in_degree here counts *dependents*, i.e. "parents" is the dependency
    // list (what a node depends on); we sort so dependencies precede
    // dependents in the output.
    let mut children: IndexMap<&EntityName, Vec<&EntityName>> =
        nodes.keys().map(|k| (k, Vec::new())).collect();
    let mut remaining_deps: IndexMap<&EntityName, usize> = IndexMap::new();

    for (name, deps) in nodes {
        let mut count = 0;
        for dep in deps {
            if nodes.contains_key(dep) {
                children.entry(dep).or_default().push(name);
                count += 1;
            }
        }
        remaining_deps.insert(name, count);
    }

    // Min-heap over entity name: `Reverse` so smallest name pops first.
    let mut ready: BinaryHeap<std::cmp::Reverse<&EntityName>> = remaining_deps
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(name, _)| std::cmp::Reverse(*name))
        .collect();

    let mut order: Vec<EntityName> = Vec::with_capacity(nodes.len());
    let mut emitted: IndexSet<&EntityName> = IndexSet::new();

    while let Some(std::cmp::Reverse(name)) = ready.pop() {
        if !emitted.insert(name) {
            continue;
        }
        order.push(name.clone());
        if let Some(kids) = children.get(name) {
            for kid in kids {
                if let Some(count) = remaining_deps.get_mut(kid) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(std::cmp::Reverse(*kid));
                    }
                }
            }
        }
    }

    if order.len() == nodes.len() {
        Some(order)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> EntityName {
        EntityName::new(s)
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("child"), vec![n("parent")]);
        nodes.insert(n("parent"), vec![]);
        nodes.insert(n("grandchild"), vec![n("child")]);

        let order = topological_order(&nodes).unwrap();
        let pos = |name: &str| order.iter().position(|e| e.as_str() == name).unwrap();
        assert!(pos("parent") < pos("child"));
        assert!(pos("child") < pos("grandchild"));
    }

    #[test]
    fn breaks_ties_by_name() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("zebra"), vec![]);
        nodes.insert(n("apple"), vec![]);
        nodes.insert(n("mango"), vec![]);

        let order = topological_order(&nodes).unwrap();
        assert_eq!(order, vec![n("apple"), n("mango"), n("zebra")]);
    }

    #[test]
    fn returns_none_on_cycle() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("a"), vec![n("b")]);
        nodes.insert(n("b"), vec![n("a")]);
        assert!(topological_order(&nodes).is_none());
    }
}
