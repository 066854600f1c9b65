//! Trait definitions for graph abstractions.
//!
//! Traversal algorithms are written against these traits rather than against
//! [`DirectedGraph`](super::DirectedGraph) so they can also run over filtered
//! views, such as the intraprocedural view of a control flow graph that ignores
//! call edges into other methods.

use crate::utils::graph::NodeId;

/// Core properties every graph exposes.
pub trait GraphBase {
    /// Returns the number of nodes. Node ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// Iterates over all node ids.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Iterates over the direct successors of `node`.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Iterates over the direct predecessors of `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}
