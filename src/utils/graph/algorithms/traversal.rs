//! Graph traversal algorithms.
//!
//! - [`dfs`] - Iterative depth-first search (pre-order)
//! - [`postorder`] - Depth-first search with post-order visitation
//! - [`reverse_postorder`] - Reverse post-order, the visiting order for forward data flow
//!
//! [`dfs`] returns an iterator for lazy evaluation. [`postorder`] and
//! [`reverse_postorder`] return collected vectors since the order requires a full
//! traversal anyway.

use crate::utils::graph::{NodeId, Successors};

/// Iterator state for [`dfs`].
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Reverse so successors are visited in edge order
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first iterator over the nodes reachable from `start`.
///
/// An out-of-range `start` yields nothing.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Computes the postorder of nodes reachable from `start`.
///
/// A node is emitted after every node first discovered through it. Successors
/// are explored in edge order, so the result is deterministic for a given
/// insertion history.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;

                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &succ in successors.iter().rev() {
                    if !visited[succ.index()] {
                        stack.push((succ, State::Enter));
                    }
                }
            }
            State::Exit => {
                result.push(node);
            }
        }
    }

    result
}

/// Computes the reverse postorder of nodes reachable from `start`.
///
/// Every node except `start` is preceded by at least one of its predecessors,
/// which is what the state resolver relies on to find a template for a join.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use crate::utils::graph::{
        algorithms::traversal::{dfs, postorder, reverse_postorder},
        DirectedGraph, NodeId,
    };

    fn loop_graph() -> (DirectedGraph<&'static str, ()>, [NodeId; 4]) {
        // entry -> header -> body -> header, header -> exit
        let mut graph = DirectedGraph::new();
        let entry = graph.add_node("entry");
        let header = graph.add_node("header");
        let body = graph.add_node("body");
        let exit = graph.add_node("exit");
        graph.add_edge(entry, header, ()).unwrap();
        graph.add_edge(header, body, ()).unwrap();
        graph.add_edge(body, header, ()).unwrap();
        graph.add_edge(header, exit, ()).unwrap();
        (graph, [entry, header, body, exit])
    }

    #[test]
    fn test_dfs_visits_reachable_once() {
        let (mut graph, [entry, header, body, exit]) = loop_graph();
        let orphan = graph.add_node("orphan");

        let order: Vec<NodeId> = dfs(&graph, entry).collect();
        assert_eq!(order, vec![entry, header, body, exit]);
        assert!(!order.contains(&orphan));
    }

    #[test]
    fn test_postorder_loop() {
        let (graph, [entry, header, body, exit]) = loop_graph();
        assert_eq!(postorder(&graph, entry), vec![body, exit, header, entry]);
    }

    #[test]
    fn test_reverse_postorder_predecessor_first() {
        let (graph, [entry, header, body, exit]) = loop_graph();
        let rpo = reverse_postorder(&graph, entry);
        assert_eq!(rpo, vec![entry, header, exit, body]);

        let pos = |n: NodeId| rpo.iter().position(|&x| x == n).unwrap();
        assert!(pos(entry) < pos(header));
        assert!(pos(header) < pos(body));
    }

    #[test]
    fn test_invalid_start() {
        let (graph, _) = loop_graph();
        assert!(postorder(&graph, NodeId::new(42)).is_empty());
        assert_eq!(dfs(&graph, NodeId::new(42)).count(), 0);
    }
}
