use indexmap::IndexMap;
use model::EntityName;
use std::collections::HashSet;

pub type Cycle = Vec<EntityName>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depth-first traversal with three-color marking. On a back-edge (an edge
/// into a node currently on the DFS stack), the cycle is emitted by walking
/// the stack from the back-edge's target to its reoccurrence (spec §4.1).
/// Cycles are canonicalized (rotated to start at their lexicographically
/// least member) so repeated traversals of the same cycle are deduplicated.
pub fn detect_cycles(
    nodes: &IndexMap<EntityName, Vec<EntityName>>,
) -> Vec<Cycle> {
    let mut color: IndexMap<&EntityName, Color> =
        nodes.keys().map(|k| (k, Color::White)).collect();
    let mut stack: Vec<EntityName> = Vec::new();
    let mut seen_canonical: HashSet<Cycle> = HashSet::new();
    let mut out = Vec::new();

    for start in nodes.keys() {
        if color.get(start) == Some(&Color::White) {
            visit(start, nodes, &mut color, &mut stack, &mut seen_canonical, &mut out);
        }
    }
    out
}

fn visit<'a>(
    node: &'a EntityName,
    nodes: &'a IndexMap<EntityName, Vec<EntityName>>,
    color: &mut IndexMap<&'a EntityName, Color>,
    stack: &mut Vec<EntityName>,
    seen_canonical: &mut HashSet<Cycle>,
    out: &mut Vec<Cycle>,
) {
    color.insert(node, Color::Gray);
    stack.push(node.clone());

    if let Some(parents) = nodes.get(node) {
        for parent in parents {
            match color.get(parent) {
                // Only descend into entities that are actually nodes of this
                // graph; a dangling reference is a missing-parent concern,
                // handled separately by `build`, not a cycle.
                None => continue,
                Some(Color::White) => {
                    visit(parent, nodes, color, stack, seen_canonical, out);
                }
                Some(Color::Gray) => {
                    if let Some(pos) = stack.iter().position(|n| n == parent) {
                        let cycle = canonicalize(&stack[pos..]);
                        if seen_canonical.insert(cycle.clone()) {
                            out.push(cycle);
                        }
                    }
                }
                Some(Color::Black) => {}
            }
        }
    }

    stack.pop();
    color.insert(node, Color::Black);
}

/// Rotate `members` so its lexicographically least entity name is first,
/// preserving cycle order (spec §4.1, P2).
fn canonicalize(members: &[EntityName]) -> Cycle {
    if members.is_empty() {
        return Vec::new();
    }
    let min_pos = members
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| name.as_str())
        .map(|(i, _)| i)
        .unwrap_or(0);

    members[min_pos..]
        .iter()
        .chain(members[..min_pos].iter())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(s: &str) -> EntityName {
        EntityName::new(s)
    }

    #[test]
    fn detects_a_two_cycle() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("a"), vec![n("b")]);
        nodes.insert(n("b"), vec![n("a")]);

        let cycles = detect_cycles(&nodes);
        assert_eq!(cycles, vec![vec![n("a"), n("b")]]);
    }

    #[test]
    fn canonicalizes_regardless_of_start() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("z"), vec![n("a")]);
        nodes.insert(n("a"), vec![n("b")]);
        nodes.insert(n("b"), vec![n("z")]);

        let cycles = detect_cycles(&nodes);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0][0], n("a"));
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let mut nodes = IndexMap::new();
        nodes.insert(n("child"), vec![n("parent")]);
        nodes.insert(n("parent"), vec![]);
        assert!(detect_cycles(&nodes).is_empty());
    }
}
