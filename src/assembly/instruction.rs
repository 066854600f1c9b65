//! CIL instruction records as consumed by control flow construction.
//!
//! An [`Instruction`] aggregates everything the compiler core needs about one
//! decoded instruction: where it sits, how it affects control flow, its operand,
//! its effect on the evaluation stack, and which basic block currently owns it.
//!
//! # Key Components
//!
//! - [`Instruction`] - A decoded instruction with its owning block
//! - [`Operand`] - Type-safe operand representation
//! - [`Immediate`] - Immediate operand values
//! - [`FlowControl`] - Control flow classification
//! - [`ImplicitEdge`] - Whether control falls through past an instruction
//! - [`StackBehavior`] - Pop/push counts
//! - [`ResultType`] - Type of the values an instruction pushes

use std::fmt;

use strum::{Display, EnumIter, EnumString};

use crate::{
    assembly::opcodes,
    cfg::BlockId,
    ir::IrType,
    metadata::token::Token,
};

/// Immediate operand values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit float
    Float64(f64),
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int32(value) => write!(f, "{value}"),
            Immediate::Int64(value) => write!(f, "{value}"),
            Immediate::Float64(value) => write!(f, "{value:?}"),
        }
    }
}

/// The operand of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value
    Immediate(Immediate),
    /// Absolute offset of a branch target
    Target(u64),
    /// Absolute offsets of switch targets
    Switch(Vec<u64>),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// Metadata token (method, type or field)
    Token(Token),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Immediate(imm) => write!(f, "{imm}"),
            Operand::Target(t) => write!(f, "IL_{t:04x}"),
            Operand::Switch(targets) => {
                write!(f, "(")?;
                for (i, t) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "IL_{t:04x}")?;
                }
                write!(f, ")")
            }
            Operand::Local(l) => write!(f, "V_{l}"),
            Operand::Argument(a) => write!(f, "A_{a}"),
            Operand::Token(t) => write!(f, "{t}"),
        }
    }
}

/// Control flow classification of an instruction.
///
/// `switch` is classified as [`FlowControl::CondBranch`]: it falls through when the
/// selector is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FlowControl {
    /// Execution continues with the next instruction
    Next,
    /// Unconditional transfer (`br`, `leave`)
    Branch,
    /// Conditional transfer (`brtrue`, `beq`, `switch`, ...)
    CondBranch,
    /// Method call (`call`, `callvirt`, `newobj`)
    Call,
    /// Return from the method
    Return,
    /// Exception throw
    Throw,
    /// Prefix or other non-executing metadata instruction
    Meta,
    /// Debugger break
    Break,
    /// Reserved phi instruction
    Phi,
}

/// Whether an instruction ending a block produces a fallthrough edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitEdge {
    /// Control continues into the next block of the method
    Fallthrough,
    /// No implicit successor
    Terminal,
}

impl FlowControl {
    /// Returns the implicit edge an instruction of this class produces when it
    /// ends a block.
    ///
    /// Only [`FlowControl::Next`] and [`FlowControl::CondBranch`] fall through;
    /// calls end blocks only when the builder splits at calls, and then it wires
    /// the call-return edge itself.
    #[must_use]
    pub const fn implicit_edge(self) -> ImplicitEdge {
        match self {
            FlowControl::Next | FlowControl::CondBranch => ImplicitEdge::Fallthrough,
            FlowControl::Branch
            | FlowControl::Call
            | FlowControl::Return
            | FlowControl::Throw
            | FlowControl::Meta
            | FlowControl::Break
            | FlowControl::Phi => ImplicitEdge::Terminal,
        }
    }

    /// True for classes that end a basic block unconditionally.
    #[must_use]
    pub const fn ends_block(self) -> bool {
        matches!(
            self,
            FlowControl::Branch | FlowControl::CondBranch | FlowControl::Return | FlowControl::Throw
        )
    }
}

/// Stack effect of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackBehavior {
    /// Number of values popped
    pub pops: u8,
    /// Number of values pushed
    pub pushes: u8,
    /// Net change in depth
    pub net_effect: i8,
}

impl StackBehavior {
    /// Creates a stack behaviour from pop and push counts.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn new(pops: u8, pushes: u8) -> Self {
        StackBehavior {
            pops,
            pushes,
            net_effect: pushes as i8 - pops as i8,
        }
    }
}

/// Type of the values an instruction pushes, for instructions whose result is
/// not a slot copy or an immediate.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultType {
    /// `int32`: comparisons, and anything the reader could not type
    #[default]
    Int32,
    /// The type of the deepest popped operand (`add`, `mul`, `shl`, `neg`, ...)
    FromOperand,
    /// A fixed type: conversions, field loads, call results, object creation
    Fixed(IrType),
}

/// A decoded CIL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset from the start of the method body
    pub offset: u64,
    /// Encoded size in bytes
    pub size: u64,
    /// Opcode byte (second byte for `0xFE`-prefixed opcodes)
    pub opcode: u8,
    /// `0xFE` for two-byte opcodes, else 0
    pub prefix: u8,
    /// Mnemonic, e.g. `ldarg.0`
    pub mnemonic: &'static str,
    /// Control flow classification
    pub flow: FlowControl,
    /// Operand
    pub operand: Operand,
    /// Stack effect
    pub stack_behavior: StackBehavior,
    /// Type of the pushed values
    pub result: ResultType,
    /// Absolute offsets of explicit branch targets
    pub branch_targets: Vec<u64>,
    /// Basic block that owns this instruction
    pub(crate) block: Option<BlockId>,
}

impl Instruction {
    /// Creates an unowned instruction.
    #[must_use]
    pub fn new(
        offset: u64,
        size: u64,
        opcode: u8,
        mnemonic: &'static str,
        flow: FlowControl,
        operand: Operand,
        stack_behavior: StackBehavior,
    ) -> Self {
        let branch_targets = match &operand {
            Operand::Target(t) => vec![*t],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        };
        Instruction {
            offset,
            size,
            opcode,
            prefix: 0,
            mnemonic,
            flow,
            operand,
            stack_behavior,
            result: ResultType::Int32,
            branch_targets,
            block: None,
        }
    }

    /// Sets the type of the values this instruction pushes.
    #[must_use]
    pub fn with_result(mut self, result: ResultType) -> Self {
        self.result = result;
        self
    }

    /// Marks the instruction as a two-byte (`0xFE`-prefixed) opcode.
    #[must_use]
    pub fn with_prefix(mut self) -> Self {
        self.prefix = opcodes::FE_PREFIX;
        self
    }

    /// The basic block that owns this instruction, once blocks have been formed.
    #[must_use]
    pub const fn block(&self) -> Option<BlockId> {
        self.block
    }

    /// True for branches and switches.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        !self.branch_targets.is_empty()
    }

    /// True if this instruction must end its basic block.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.flow.ends_block()
    }

    /// True for `newobj`.
    #[must_use]
    pub const fn is_newobj(&self) -> bool {
        self.prefix == 0 && self.opcode == opcodes::NEWOBJ
    }

    /// True for `newarr`.
    #[must_use]
    pub const fn is_newarr(&self) -> bool {
        self.prefix == 0 && self.opcode == opcodes::NEWARR
    }

    /// The method token a call instruction invokes.
    #[must_use]
    pub fn call_target(&self) -> Option<Token> {
        match (&self.operand, self.flow) {
            (Operand::Token(token), FlowControl::Call) if token.is_method() => Some(*token),
            _ => None,
        }
    }

    /// Offset of the instruction following this one.
    #[must_use]
    pub const fn next_offset(&self) -> u64 {
        self.offset + self.size
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.mnemonic)?;
        if self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_implicit_edge_table() {
        let falls: Vec<FlowControl> = FlowControl::iter()
            .filter(|f| f.implicit_edge() == ImplicitEdge::Fallthrough)
            .collect();
        assert_eq!(falls, vec![FlowControl::Next, FlowControl::CondBranch]);
        assert_eq!(FlowControl::Call.implicit_edge(), ImplicitEdge::Terminal);
    }

    #[test]
    fn test_flow_spelling() {
        assert_eq!(FlowControl::CondBranch.to_string(), "cond_branch");
        assert_eq!(FlowControl::from_str("return").unwrap(), FlowControl::Return);
    }

    #[test]
    fn test_branch_targets_from_operand() {
        let br = Instruction::new(
            0,
            5,
            opcodes::BR,
            "br",
            FlowControl::Branch,
            Operand::Target(0x10),
            StackBehavior::new(0, 0),
        );
        assert!(br.is_branch());
        assert!(br.is_terminal());
        assert_eq!(br.branch_targets, vec![0x10]);
        assert_eq!(br.to_string(), "IL_0000: br IL_0010");
        assert_eq!(br.block(), None);
    }

    #[test]
    fn test_call_target_requires_method_token() {
        let call = Instruction::new(
            0,
            5,
            opcodes::CALL,
            "call",
            FlowControl::Call,
            Operand::Token(Token::method(2)),
            StackBehavior::new(1, 1),
        );
        assert_eq!(call.call_target(), Some(Token::method(2)));
        assert!(!call.is_newobj());

        let newarr = Instruction::new(
            0,
            5,
            opcodes::NEWARR,
            "newarr",
            FlowControl::Next,
            Operand::Token(Token(0x0200_0001)),
            StackBehavior::new(1, 1),
        );
        assert!(newarr.is_newarr());
        assert_eq!(newarr.call_target(), None);
    }

    #[test]
    fn test_result_type_defaults_to_int32() {
        let ceq = Instruction::new(
            0,
            2,
            opcodes::FE_CEQ,
            "ceq",
            FlowControl::Next,
            Operand::None,
            StackBehavior::new(2, 1),
        );
        assert_eq!(ceq.result, ResultType::Int32);
        let typed = ceq.with_result(ResultType::Fixed(IrType::F64));
        assert_eq!(typed.result, ResultType::Fixed(IrType::F64));
    }

    #[test]
    fn test_stack_behavior_net() {
        assert_eq!(StackBehavior::new(2, 1).net_effect, -1);
        assert_eq!(StackBehavior::new(0, 1).net_effect, 1);
    }
}
