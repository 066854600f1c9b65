//! Basic blocks.

use crate::{
    assembly::{FlowControl, Instruction},
    metadata::token::Token,
    utils::graph::NodeId,
};

/// Identifier of a basic block within a [`ControlFlowGraph`](super::ControlFlowGraph).
pub type BlockId = NodeId;

/// A maximal straight-line run of instructions with one entry and one exit.
///
/// A block belongs to exactly one method and knows that method's entry block.
/// Only the entry block carries the method's ordered block list; the last
/// element of that list is the method's exit block.
///
/// The `is_*` classifiers look at the current last instruction on every call, so
/// they stay correct when a split moves instructions away.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub(crate) id: BlockId,
    pub(crate) method: Token,
    pub(crate) entry: BlockId,
    pub(crate) offset: u64,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) layout: Vec<BlockId>,
}

impl BasicBlock {
    pub(crate) fn new(id: BlockId, method: Token, entry: BlockId, offset: u64) -> Self {
        BasicBlock {
            id,
            method,
            entry,
            offset,
            instructions: Vec::new(),
            layout: Vec::new(),
        }
    }

    /// This block's id.
    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    /// The owning method.
    #[must_use]
    pub const fn method(&self) -> Token {
        self.method
    }

    /// The owning method's entry block.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// True if this block is its method's entry.
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.entry == self.id
    }

    /// Offset the block was named after, which is the offset of its first
    /// instruction once populated.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction that ends the block.
    #[must_use]
    pub fn last(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// True if `offset` falls inside one of this block's instructions.
    #[must_use]
    pub fn contains_offset(&self, offset: u64) -> bool {
        match (self.instructions.first(), self.instructions.last()) {
            (Some(first), Some(last)) => first.offset <= offset && offset < last.next_offset(),
            _ => false,
        }
    }

    /// The method's ordered block list; `Some` only on the entry block.
    #[must_use]
    pub fn ordered_blocks(&self) -> Option<&[BlockId]> {
        if self.is_entry() {
            Some(&self.layout)
        } else {
            None
        }
    }

    /// True if the block ends in a call.
    #[must_use]
    pub fn is_call(&self) -> bool {
        self.last().is_some_and(|i| i.flow == FlowControl::Call)
    }

    /// True if the block ends in a return.
    #[must_use]
    pub fn is_return(&self) -> bool {
        self.last().is_some_and(|i| i.flow == FlowControl::Return)
    }

    /// True if the block ends in `newobj`.
    #[must_use]
    pub fn is_newobj(&self) -> bool {
        self.last().is_some_and(Instruction::is_newobj)
    }

    /// True if the block ends in `newarr`.
    #[must_use]
    pub fn is_newarr(&self) -> bool {
        self.last().is_some_and(Instruction::is_newarr)
    }
}
