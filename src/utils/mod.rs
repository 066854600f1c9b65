//! Shared infrastructure: the generic directed graph and DOT helpers.

mod dot;
pub mod graph;

pub use dot::escape_dot;
