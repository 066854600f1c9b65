//! Generic directed graph infrastructure.
//!
//! The control flow graph is layered on top of [`DirectedGraph`]: basic blocks are
//! node data and [`CfgEdge`](crate::cfg::CfgEdge)s are edge data. The traversal
//! algorithms in [`algorithms`] are written against the traits in this module so
//! they can run over filtered views of the graph.
//!
//! # Key Components
//!
//! - [`NodeId`] - Strongly-typed node identifier
//! - [`EdgeId`] - Strongly-typed edge identifier
//! - [`DirectedGraph`] - Arena graph with ordered adjacency and edge removal
//! - [`algorithms`] - Traversals
//!
//! # Thread Safety
//!
//! All types in this module are [`Send`] and [`Sync`] when their node and edge
//! data are.

mod directed;
mod edge;
mod node;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use edge::EdgeId;
pub use node::NodeId;
pub use traits::{GraphBase, Predecessors, Successors};
