//! Core directed graph implementation.
//!
//! [`DirectedGraph`] stores node data in an arena and edges in a second arena,
//! with per-node adjacency lists of [`EdgeId`]s in insertion order. Edge removal
//! leaves a tombstone in the edge arena so that outstanding ids stay unambiguous;
//! nodes are never removed.

use crate::{
    utils::graph::{
        edge::EdgeId,
        node::NodeId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

/// Internal storage for edge data and endpoints.
#[derive(Debug, Clone)]
struct EdgeData<E> {
    /// Source node of the edge
    source: NodeId,
    /// Target node of the edge
    target: NodeId,
    /// User-provided edge data
    data: E,
}

/// A directed graph with typed node and edge data.
///
/// - Generic node data (`N`) and edge data (`E`)
/// - Forward and backward adjacency, both ordered by edge insertion
/// - Edge removal with tombstoned ids
///
/// # Examples
///
/// ```rust
/// use cilflow::utils::graph::DirectedGraph;
///
/// let mut graph: DirectedGraph<&str, u32> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
/// let e = graph.add_edge(a, b, 10).unwrap();
///
/// assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b]);
/// assert_eq!(graph.remove_edge(e), Some(10));
/// assert_eq!(graph.edge_count(), 0);
/// assert!(graph.predecessors(b).next().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    /// Node data storage
    nodes: Vec<N>,
    /// Edge data storage, `None` for removed edges
    edges: Vec<Option<EdgeData<E>>>,
    /// Outgoing edges per node
    outgoing: Vec<Vec<EdgeId>>,
    /// Incoming edges per node
    incoming: Vec<Vec<EdgeId>>,
    /// Number of live edges
    live_edges: usize,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Creates a new empty directed graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            live_edges: 0,
        }
    }

    /// Adds a new node and returns its sequential id.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Returns the data associated with the given node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns mutable access to the data associated with the given node.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(node.index())
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    /// Iterates over all nodes with their ids.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, data)| (NodeId::new(i), data))
    }

    /// Adds a directed edge from `source` to `target`.
    ///
    /// Parallel edges and self-loops are permitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint does not exist.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<EdgeId> {
        if source.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "source node {} does not exist in graph with {} nodes",
                source,
                self.nodes.len()
            )));
        }
        if target.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "target node {} does not exist in graph with {} nodes",
                target,
                self.nodes.len()
            )));
        }

        let id = EdgeId::new(self.edges.len());
        self.edges.push(Some(EdgeData {
            source,
            target,
            data,
        }));

        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        self.live_edges += 1;

        Ok(id)
    }

    /// Removes an edge and returns its data.
    ///
    /// Returns `None` if the edge never existed or was already removed. The id
    /// stays reserved.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Option<E> {
        let removed = self.edges.get_mut(edge.index())?.take()?;
        self.outgoing[removed.source.index()].retain(|&id| id != edge);
        self.incoming[removed.target.index()].retain(|&id| id != edge);
        self.live_edges -= 1;
        Some(removed.data)
    }

    /// Returns the data associated with a live edge.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.live(edge).map(|e| &e.data)
    }

    /// Returns the `(source, target)` pair of a live edge.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.live(edge).map(|e| (e.source, e.target))
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Iterates over all live edges with their ids, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId::new(i), &e.data)))
    }

    /// Iterates over the targets of `node`'s outgoing edges, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing[node.index()]
            .iter()
            .filter_map(|&edge_id| self.live(edge_id).map(|e| e.target))
    }

    /// Iterates over the sources of `node`'s incoming edges, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.incoming[node.index()]
            .iter()
            .filter_map(|&edge_id| self.live(edge_id).map(|e| e.source))
    }

    /// Iterates over `node`'s outgoing edges with their data.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.outgoing[node.index()]
            .iter()
            .filter_map(|&edge_id| self.live(edge_id).map(|e| (edge_id, &e.data)))
    }

    /// Iterates over `node`'s incoming edges with their data.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not exist.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.incoming[node.index()]
            .iter()
            .filter_map(|&edge_id| self.live(edge_id).map(|e| (edge_id, &e.data)))
    }

    fn live(&self, edge: EdgeId) -> Option<&EdgeData<E>> {
        self.edges.get(edge.index()).and_then(Option::as_ref)
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::predecessors(self, node)
    }
}
