//! Stable topological sort.
//!
//! Kahn's algorithm with the ready set kept as a min-heap on node index, so
//! whenever several nodes are ready the one that came first in the input
//! wins. The output is a pure function of the input order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::graph::DependencyGraph;

/// The result of sorting a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortOutcome {
    /// Nodes in dependency order: every node after all of its dependencies.
    pub sorted: Vec<usize>,
    /// Nodes that never became ready, in input order. Non-empty only when
    /// the graph has a cycle.
    pub unresolved: Vec<usize>,
}

impl SortOutcome {
    /// Returns true if every node was sorted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Returns the creation order: sorted nodes, then unresolved ones.
    #[must_use]
    pub fn creation_order(&self) -> Vec<usize> {
        self.sorted
            .iter()
            .chain(&self.unresolved)
            .copied()
            .collect()
    }

    /// Returns the removal order: unresolved nodes in input order, then the
    /// sorted nodes reversed so dependents go first.
    ///
    /// A sorted node never depends on an unresolved one, so unresolved nodes
    /// can always be removed before every sorted node.
    #[must_use]
    pub fn removal_order(&self) -> Vec<usize> {
        self.unresolved
            .iter()
            .chain(self.sorted.iter().rev())
            .copied()
            .collect()
    }
}

/// Sorts the graph so that every node comes after its dependencies.
#[must_use]
pub fn stable_topological_sort(graph: &DependencyGraph) -> SortOutcome {
    let mut in_degree = graph.in_degrees();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut sorted = Vec::with_capacity(graph.len());
    let mut placed = vec![false; graph.len()];
    while let Some(Reverse(node)) = ready.pop() {
        sorted.push(node);
        placed[node] = true;
        for &dependent in graph.dependents(node) {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    let unresolved = (0..graph.len()).filter(|node| !placed[*node]).collect();
    SortOutcome { sorted, unresolved }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Operation, TableAnnotations};

    fn mv(name: &str, query: &str) -> Operation {
        Operation::create_annotated(name, TableAnnotations::materialized_view(None, Some(query)))
    }

    fn sort(ops: &[Operation]) -> SortOutcome {
        let refs: Vec<&Operation> = ops.iter().collect();
        stable_topological_sort(&DependencyGraph::build(&refs))
    }

    #[test]
    fn test_independent_nodes_keep_input_order() {
        let ops = vec![
            mv("c", "SELECT 1 FROM x"),
            mv("a", "SELECT 1 FROM y"),
            mv("b", "SELECT 1 FROM z"),
        ];
        let outcome = sort(&ops);
        assert_eq!(outcome.sorted, vec![0, 1, 2]);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_chain_is_ordered() {
        let ops = vec![
            mv("c", "SELECT * FROM b"),
            mv("b", "SELECT * FROM a"),
            mv("a", "SELECT * FROM raw"),
        ];
        let outcome = sort(&ops);
        assert_eq!(outcome.creation_order(), vec![2, 1, 0]);
        assert_eq!(outcome.removal_order(), vec![0, 1, 2]);
    }

    #[test]
    fn test_ready_ties_resolve_by_position() {
        // Once `root` is placed, both `late` (node 0) and `early` (node 2)
        // become ready; the lower index goes first.
        let ops = vec![
            mv("late", "SELECT * FROM root"),
            mv("root", "SELECT * FROM raw"),
            mv("early", "SELECT * FROM root"),
        ];
        assert_eq!(sort(&ops).sorted, vec![1, 0, 2]);
    }

    #[test]
    fn test_cycle_members_are_unresolved() {
        let ops = vec![
            mv("free", "SELECT * FROM raw"),
            mv("a", "SELECT * FROM b"),
            mv("b", "SELECT * FROM a"),
            mv("after", "SELECT * FROM a"),
        ];
        let outcome = sort(&ops);
        assert_eq!(outcome.sorted, vec![0]);
        assert_eq!(outcome.unresolved, vec![1, 2, 3]);
        assert_eq!(outcome.creation_order(), vec![0, 1, 2, 3]);
        assert_eq!(outcome.removal_order(), vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_cycle_over_shared_source_removes_source_last() {
        let ops = vec![
            mv("raw_mv", "SELECT * FROM events"),
            mv("a", "SELECT * FROM raw_mv JOIN b USING (id)"),
            mv("b", "SELECT * FROM raw_mv JOIN a USING (id)"),
        ];
        let outcome = sort(&ops);
        assert_eq!(outcome.sorted, vec![0]);
        assert_eq!(outcome.removal_order(), vec![1, 2, 0]);
    }

    #[test]
    fn test_empty_graph() {
        let outcome = sort(&[]);
        assert!(outcome.sorted.is_empty());
        assert!(outcome.is_complete());
    }
}
