// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cilflow
//!
//! Control flow graphs and SSA stack states for CIL method bodies.
//!
//! `cilflow` is the middle of a CIL-to-native compiler. It takes decoded method
//! bodies, partitions them into basic blocks, and walks each method's blocks in
//! reverse postorder to compute the abstract operand stack at every block
//! boundary. Arguments and locals live at the bottom of that stack, so a single
//! index-addressable sequence names every value a block can see. Where control
//! flow merges, each stack slot becomes a phi placeholder whose operands are
//! filled in once every predecessor, back edges included, has been lowered.
//!
//! ## Features
//!
//! - **Block partitioning** - Leaders at branch targets, after terminators and optionally after calls
//! - **Multi-method graphs** - Blocks of many methods in one arena, with change sets and call edges
//! - **State resolution** - Parameters, zeroed locals, phi placeholders and a two-phase fill
//! - **Pluggable backend** - [`ir::Backend`] creates parameters, allocas and phis
//! - **Pluggable lowering** - [`compiler::BlockLowering`] turns entry states into exit states
//! - **Diagnostics** - Text and DOT dumps, state traces gated by [`config::TraceFlags`]
//!
//! ## Quick Start
//!
//! ```rust
//! use cilflow::prelude::*;
//!
//! let code = InstructionAssembler::new()
//!     .ldc_i4(0)
//!     .stloc(0)
//!     .label("head")
//!     .ldloc(0)
//!     .ldarg(0)
//!     .blt("body")
//!     .ldloc(0)
//!     .ret_value()
//!     .label("body")
//!     .ldloc(0)
//!     .ldc_i4(1)
//!     .add()
//!     .stloc(0)
//!     .br("head")
//!     .finish()?;
//! let body = MethodBody::new(
//!     Token::method(1),
//!     "CountTo",
//!     MethodSignature::new_static(vec![SourceType::I32], SourceType::I32),
//!     vec![SourceType::I32],
//!     code,
//! );
//!
//! let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
//! let header = compiled.cfg.ordered_blocks(body.token)?[1];
//! assert_eq!(compiled.entry_state(header)?.phis().len(), 2);
//! # Ok::<(), cilflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - Instruction records and a label-resolving assembler
//! - [`metadata`] - Tokens, signatures, method bodies and shapes
//! - [`cfg`] - The control flow graph, block partitioning and dumps
//! - [`ir`] - Target types, values and the backend seam
//! - [`state`] - Abstract stacks, sections and the state resolver
//! - [`compiler`] - Per-method driver, lowering seam and parallel driver
//! - [`config`] - Options and trace flags
//!
//! ## Error Handling
//!
//! Every fault is fatal to the method being compiled and comes back as an
//! [`Error`]:
//!
//! ```rust
//! use cilflow::{prelude::*, Error};
//!
//! let code = InstructionAssembler::new().pop().ret().finish()?;
//! let body = MethodBody::new(Token::method(1), "Broken", MethodSignature::default(), Vec::new(), code);
//!
//! match MethodCompiler::new(CompilerOptions::default()).compile(&body) {
//!     Err(Error::StackUnderflow { block, .. }) => println!("underflow in {block}"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok::<(), cilflow::Error>(())
//! ```

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use cilflow::prelude::*;
///
/// let options = CompilerOptions::verbose();
/// assert!(options.traces(TraceFlags::STATE));
/// ```
pub mod prelude;

/// Instruction records and the instruction assembler.
///
/// # Key Types
///
/// - [`assembly::Instruction`] - A decoded instruction and its owning block
/// - [`assembly::FlowControl`] - Control flow class and its implicit edge
/// - [`assembly::InstructionAssembler`] - Fluent builder resolving branch labels
pub mod assembly;

/// Control flow graph construction, splitting, queries and dumps.
pub mod cfg;

/// Per-method compilation drivers.
pub mod compiler;

/// Compiler options and trace flags.
pub mod config;

/// Target types, values and the backend seam.
pub mod ir;

/// Method tokens, signatures and bodies.
pub mod metadata;

/// Abstract stack states and their resolution.
pub mod state;

/// Graph primitives and formatting helpers.
pub mod utils;

/// `cilflow` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cilflow` Error type
///
/// The main error type for all operations in this crate, covering structural
/// faults in the graph and lookup faults in the resolution protocol.
pub use error::Error;
