//! # cilflow Prelude
//!
//! The types most programs need to build graphs, resolve states and inspect the
//! results. Import with `use cilflow::prelude::*;`.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilflow operations
pub use crate::Error;

/// The result type used throughout cilflow
pub use crate::Result;

/// Options and trace switches
pub use crate::config::{CompilerOptions, TraceFlags};

// ================================================================================================
// Input
// ================================================================================================

/// Instruction records and the assembler used to build them
pub use crate::assembly::{FlowControl, Instruction, InstructionAssembler, Operand};

/// Method metadata
pub use crate::metadata::{
    signature::{MethodSignature, SourceType},
    token::Token,
    MethodBody, MethodShape,
};

// ================================================================================================
// Graph
// ================================================================================================

/// Control flow graph and its parts
pub use crate::cfg::{BasicBlock, BlockId, CfgBuilder, ControlFlowGraph, EdgeKind};

// ================================================================================================
// States and Values
// ================================================================================================

/// Target-IR types, values and the backend seam
pub use crate::ir::{Backend, IrType, Value, ValueTable};

/// Abstract stack states
pub use crate::state::{AbstractStack, Section, State, StateResolver};

// ================================================================================================
// Drivers
// ================================================================================================

/// Method compilation
pub use crate::compiler::{
    compile_methods, discover_callees, BlockLowering, CompiledMethod, MethodCompiler,
    StackEffectLowering,
};
