//! CIL instruction model.
//!
//! The compiler core consumes a method body as an ordered sequence of
//! [`Instruction`] records. A binary reader produces them in production; the
//! [`InstructionAssembler`] produces them for tests, benchmarks and tools.
//!
//! # Key Components
//!
//! - [`Instruction`] - Decoded instruction with flow classification and owning block
//! - [`FlowControl`] - Control flow class, with the [`FlowControl::implicit_edge`] lookup
//! - [`InstructionAssembler`] - Fluent builder with label resolution
//! - [`opcodes`] - Opcode byte constants

mod assembler;
mod instruction;
pub mod opcodes;

pub use assembler::InstructionAssembler;
pub use instruction::{
    FlowControl, Immediate, ImplicitEdge, Instruction, Operand, ResultType, StackBehavior,
};
