//! Graph algorithms used by control flow construction and state resolution.
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | DFS | O(V + E) | Reachability, validation |
//! | Reverse postorder | O(V + E) | Forward data flow (state resolution) |

mod traversal;

pub use traversal::{dfs, postorder, reverse_postorder, DfsIterator};
