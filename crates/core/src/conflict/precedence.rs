use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::conflict::Conflict;
use crate::graph::digraph::DiGraph;
use crate::schedule::types::TransactionId;

/// All conflicts from `source` to `target`, merged.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceEdge {
    pub source: TransactionId,
    pub target: TransactionId,
    /// Conflict labels joined with `", "`, e.g. `RW(X), WW(X)`.
    pub label: String,
    pub conflict_count: usize,
    pub is_cycle_edge: bool,
}

#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "schemars", derive(::schemars::JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrecedenceGraph {
    pub nodes: Vec<TransactionId>,
    pub edges: Vec<PrecedenceEdge>,
    pub is_serializable: bool,
    /// Edges of the reported cycle, in cycle order. Empty when serializable.
    pub cycle_edges: Vec<PrecedenceEdge>,
}

impl PrecedenceGraph {
    fn digraph(&self) -> DiGraph<TransactionId> {
        let mut graph = DiGraph::default();
        for node in &self.nodes {
            graph.add_vertex(node.clone());
        }
        for edge in &self.edges {
            graph.add_edge(edge.source.clone(), edge.target.clone());
        }
        graph
    }

    /// An equivalent serial order of the transactions, if one exists.
    ///
    /// Ties are broken by node order, i.e. first appearance in the schedule.
    #[must_use]
    pub fn serial_order(&self) -> Option<Vec<TransactionId>> {
        self.digraph().topological_sort()
    }

    #[must_use]
    pub fn edge(&self, source: &TransactionId, target: &TransactionId) -> Option<&PrecedenceEdge> {
        self.edges
            .iter()
            .find(|edge| edge.source == *source && edge.target == *target)
    }
}

/// Build the precedence graph over `nodes` from the detected conflicts and
/// look for a cycle.
///
/// Nodes not in `nodes` but named by a conflict are appended. The cycle
/// search follows node order and then edge order, and reports only the
/// first cycle found.
#[must_use]
pub fn build_precedence_graph(nodes: &[TransactionId], conflicts: &[Conflict]) -> PrecedenceGraph {
    let mut edges: Vec<PrecedenceEdge> = Vec::new();
    for conflict in conflicts {
        let (source, target) = (&conflict.first.transaction, &conflict.second.transaction);
        if let Some(edge) = edges
            .iter_mut()
            .find(|edge| edge.source == *source && edge.target == *target)
        {
            edge.label.push_str(", ");
            edge.label.push_str(&conflict.label());
            edge.conflict_count += 1;
        } else {
            edges.push(PrecedenceEdge {
                source: source.clone(),
                target: target.clone(),
                label: conflict.label(),
                conflict_count: 1,
                is_cycle_edge: false,
            });
        }
    }

    let mut graph = PrecedenceGraph {
        nodes: nodes.to_vec(),
        edges,
        is_serializable: true,
        cycle_edges: Vec::new(),
    };
    let digraph = graph.digraph();
    graph.nodes = digraph.vertices().to_vec();

    if let Some(cycle) = digraph.find_cycle() {
        let closing = cycle.iter().zip(cycle.iter().cycle().skip(1));
        for (source, target) in closing {
            if let Some(edge) = graph
                .edges
                .iter_mut()
                .find(|edge| edge.source == *source && edge.target == *target)
            {
                edge.is_cycle_edge = true;
                graph.cycle_edges.push(edge.clone());
            }
        }
        graph.is_serializable = false;
    }

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        serializable = graph.is_serializable,
        "built precedence graph"
    );
    graph
}

/// One line describing the reported cycle, e.g.
/// `T1 -> T2 [RW(X)]; T2 -> T1 [RW(Y)]`. Empty when there is no cycle.
#[must_use]
pub fn describe_cycle(graph: &PrecedenceGraph) -> String {
    graph
        .cycle_edges
        .iter()
        .map(|edge| format!("{} -> {} [{}]", edge.source, edge.target, edge.label))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::detect_conflicts;
    use crate::schedule::types::Operation;

    fn ids(raw: &[u64]) -> Vec<TransactionId> {
        raw.iter().copied().map(TransactionId::from).collect()
    }

    #[test]
    fn test_parallel_conflicts_merge() {
        let ops = vec![
            Operation::read(0, 1, "X"),
            Operation::write(1, 1, "X"),
            Operation::read(2, 2, "X"),
            Operation::write(3, 2, "X"),
        ];
        let graph = build_precedence_graph(&ids(&[1, 2]), &detect_conflicts(&ops));
        assert_eq!(graph.edges.len(), 1);
        let edge = &graph.edges[0];
        assert_eq!(
            (&edge.source, &edge.target),
            (&TransactionId::from(1), &TransactionId::from(2))
        );
        assert_eq!(edge.label, "RW(X), WR(X), WW(X)");
        assert_eq!(edge.conflict_count, 3);
        assert!(graph.is_serializable);
        assert_eq!(graph.serial_order(), Some(ids(&[1, 2])));
        assert_eq!(describe_cycle(&graph), "");
    }

    #[test]
    fn test_two_cycle() {
        let ops = vec![
            Operation::read(0, 1, "X"),
            Operation::write(1, 2, "X"),
            Operation::read(2, 2, "Y"),
            Operation::write(3, 1, "Y"),
        ];
        let graph = build_precedence_graph(&ids(&[1, 2]), &detect_conflicts(&ops));
        assert!(!graph.is_serializable);
        assert_eq!(graph.cycle_edges.len(), 2);
        assert!(graph.edges.iter().all(|edge| edge.is_cycle_edge));
        assert_eq!(graph.serial_order(), None);
        assert_eq!(describe_cycle(&graph), "T1 -> T2 [RW(X)]; T2 -> T1 [RW(Y)]");
    }

    #[test]
    fn test_only_cycle_edges_marked() {
        // T3 -> T1 feeds into the T1 <-> T2 cycle but is not part of it.
        let ops = vec![
            Operation::write(0, 3, "Z"),
            Operation::read(1, 1, "Z"),
            Operation::read(2, 1, "X"),
            Operation::write(3, 2, "X"),
            Operation::read(4, 2, "Y"),
            Operation::write(5, 1, "Y"),
        ];
        let graph = build_precedence_graph(&ids(&[3, 1, 2]), &detect_conflicts(&ops));
        assert!(!graph.is_serializable);
        let tail = graph
            .edge(&TransactionId::from(3), &TransactionId::from(1))
            .map(|edge| edge.is_cycle_edge);
        assert_eq!(tail, Some(false));
        assert_eq!(graph.cycle_edges.len(), 2);
        for edge in &graph.cycle_edges {
            assert!(graph.edges.contains(edge));
        }
    }

    #[test]
    fn test_isolated_nodes_kept() {
        let graph = build_precedence_graph(&ids(&[4, 9]), &[]);
        assert_eq!(graph.nodes, ids(&[4, 9]));
        assert!(graph.edges.is_empty());
        assert!(graph.is_serializable);
        assert_eq!(graph.serial_order(), Some(ids(&[4, 9])));
    }

    #[test]
    fn test_serial_order_respects_edges() {
        let ops = vec![Operation::write(0, 2, "X"), Operation::write(1, 1, "X")];
        let graph = build_precedence_graph(&ids(&[2, 1]), &detect_conflicts(&ops));
        assert_eq!(graph.serial_order(), Some(ids(&[2, 1])));
    }
}
