//! Control flow edges.

use strum::{Display, EnumIter, EnumString};

/// How control reaches the target of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum EdgeKind {
    /// Control runs off the end of the source into the next block
    Fallthrough,
    /// Unconditional branch
    Branch,
    /// Taken side of a conditional branch
    Conditional,
    /// One case of a `switch`
    Switch,
    /// Call from a caller block into a callee's entry
    Call,
    /// Resumption after a call that ended its block
    CallReturn,
}

/// Edge data stored in the control flow graph.
///
/// Whether an edge is interprocedural is fixed when it is created: blocks never
/// change method, so the flag stays valid when split moves the edge to a new source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfgEdge {
    kind: EdgeKind,
    interprocedural: bool,
}

impl CfgEdge {
    /// Creates an edge.
    #[must_use]
    pub const fn new(kind: EdgeKind, interprocedural: bool) -> Self {
        CfgEdge {
            kind,
            interprocedural,
        }
    }

    /// Edge kind.
    #[must_use]
    pub const fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// True if source and target belong to different methods.
    #[must_use]
    pub const fn is_interprocedural(&self) -> bool {
        self.interprocedural
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_kind_spelling() {
        assert_eq!(EdgeKind::CallReturn.to_string(), "call-return");
        assert_eq!(EdgeKind::from_str("fallthrough").unwrap(), EdgeKind::Fallthrough);
    }

    #[test]
    fn test_edge_flags() {
        let edge = CfgEdge::new(EdgeKind::Call, true);
        assert!(edge.is_interprocedural());
        assert_eq!(edge.kind(), EdgeKind::Call);
        assert!(!CfgEdge::new(EdgeKind::Branch, false).is_interprocedural());
    }
}
