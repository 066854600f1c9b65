use thiserror::Error;

use crate::{cfg::BlockId, metadata::token::Token};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every fault the compiler core can report.
///
/// All faults are fatal for the method being compiled. They indicate either a malformed
/// control flow graph (a structural fault) or a caller that violated the resolution
/// protocol (a lookup fault). Nothing here is transient, so there is no retry: the
/// method-compilation driver receives the error and may skip the method.
///
/// # Error Categories
///
/// ## Structural faults
/// - [`Error::InterproceduralEdge`] - An edge crosses methods where only intraprocedural edges are valid
/// - [`Error::DeadBlock`] - A non-entry block without predecessors
/// - [`Error::StackSizeMismatch`] - Predecessors of a join disagree on the abstract stack
/// - [`Error::UnresolvedTemplate`] - No predecessor of a join was resolved before the join
/// - [`Error::UnhandledType`] - A local variable type with no zero-initialisation rule
/// - [`Error::EmptySplit`] - A split that would leave one half without instructions
/// - [`Error::PhiTypeMismatch`] - An incoming value disagrees with its phi's type
/// - [`Error::StackUnderflow`] - Lowering popped into the locals section
/// - [`Error::Malformed`] - Any other malformed input
///
/// ## Lookup faults
/// - [`Error::UnknownState`] - Exit state requested for a block that was never resolved
/// - [`Error::UnknownChangeSet`] - Change-set token that was never issued (or already popped)
/// - [`Error::UnknownBlock`] - Block id outside of the graph
/// - [`Error::UnknownMethod`] - Method token without an entry block
///
/// # Examples
///
/// ```rust
/// use cilflow::{cfg::ControlFlowGraph, Error};
///
/// let mut cfg = ControlFlowGraph::new();
/// match cfg.pop_change_set(42u32.into()) {
///     Err(Error::UnknownChangeSet(token)) => println!("never issued: {token}"),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be processed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An interprocedural edge was found where only intraprocedural edges are valid.
    #[error("Interprocedural edge should not exist: {from} -> {to}")]
    InterproceduralEdge {
        /// Source block of the offending edge
        from: BlockId,
        /// Target block of the offending edge
        to: BlockId,
    },

    /// A block without predecessors that is not its method's entry.
    #[error("Cannot handle dead code block {0}")]
    DeadBlock(BlockId),

    /// Predecessors of a join disagree on stack depth or section layout.
    #[error("Miscalculation in stack size at {block}: expected {expected}, found {found}")]
    StackSizeMismatch {
        /// The join block being resolved
        block: BlockId,
        /// Depth (or extent) established by the first predecessor
        expected: usize,
        /// Depth (or extent) reported by a disagreeing predecessor
        found: usize,
    },

    /// A join was visited before any of its predecessors completed resolution.
    #[error("Predecessor edge computation failed: no resolved predecessor for {0}")]
    UnresolvedTemplate(BlockId),

    /// A local variable type whose kind has no zero-initialisation rule.
    #[error("Unhandled type {0}")]
    UnhandledType(String),

    /// A split that would produce an empty block.
    #[error("Cannot split {block} at {index}: block has {len} instructions")]
    EmptySplit {
        /// The block that was asked to split
        block: BlockId,
        /// The requested split index
        index: usize,
        /// Instruction count of the block
        len: usize,
    },

    /// A phi operand whose type differs from the phi's own type.
    #[error("Phi type mismatch at {block} slot {slot}: phi is {expected}, {from} supplies {found}")]
    PhiTypeMismatch {
        /// The join block owning the phi
        block: BlockId,
        /// Stack slot of the phi
        slot: usize,
        /// Predecessor supplying the operand
        from: BlockId,
        /// The phi's type
        expected: String,
        /// The operand's type
        found: String,
    },

    /// A lowering popped a value that belongs to the locals section or below.
    #[error("Stack underflow in {block}: depth {depth} cannot drop below {floor}")]
    StackUnderflow {
        /// The block being lowered
        block: BlockId,
        /// Depth before the failing pop
        depth: usize,
        /// Top of the locals section
        floor: usize,
    },

    /// Exit state requested for a block that has never been resolved.
    #[error("No state recorded for block {0}")]
    UnknownState(BlockId),

    /// A change-set token that is not open.
    #[error("Unknown change set {0}")]
    UnknownChangeSet(crate::cfg::ChangeSetToken),

    /// A block id that does not exist in the graph.
    #[error("Block {0} does not exist")]
    UnknownBlock(BlockId),

    /// A method token with no entry block in the graph.
    #[error("Method {0} has no entry block")]
    UnknownMethod(Token),

    /// Generic graph construction error.
    #[error("{0}")]
    GraphError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_macro_records_location() {
        let err = malformed_error!("bad target {}", 7);
        match err {
            Error::Malformed {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "bad target 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_stack_size_message() {
        let err = Error::StackSizeMismatch {
            block: BlockId::new(3),
            expected: 2,
            found: 3,
        };
        assert!(err.to_string().starts_with("Miscalculation in stack size"));
    }
}
