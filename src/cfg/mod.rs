//! Control flow graph over CIL method bodies.
//!
//! One [`ControlFlowGraph`] holds the blocks of many methods. Each block is named
//! by its method and starting IL offset; each method has an entry block carrying
//! the method's ordered block list. Edges between blocks of the same method are
//! intraprocedural; call edges into another method's entry are interprocedural
//! and only serve callee discovery.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - Blocks, edges, change sets, splitting
//! - [`CfgBuilder`] - Partitions method bodies into blocks and wires edges
//! - [`BasicBlock`] / [`CfgEdge`] - Node and edge payloads
//!
//! # Examples
//!
//! ```rust
//! use cilflow::{
//!     assembly::InstructionAssembler,
//!     cfg::{CfgBuilder, ControlFlowGraph},
//!     config::CompilerOptions,
//!     metadata::{signature::MethodSignature, token::Token, MethodBody},
//! };
//!
//! let code = InstructionAssembler::new().nop().ret().finish()?;
//! let body = MethodBody::new(Token::method(1), "Main", MethodSignature::default(), Vec::new(), code);
//!
//! let mut cfg = ControlFlowGraph::new();
//! CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
//! assert_eq!(cfg.block_count(), 1);
//! println!("{}", cfg.to_dot());
//! # Ok::<(), cilflow::Error>(())
//! ```

mod block;
mod builder;
mod dump;
mod edge;
mod graph;

pub use block::{BasicBlock, BlockId};
pub use builder::CfgBuilder;
pub use edge::{CfgEdge, EdgeKind};
pub use graph::{ChangeSetToken, ControlFlowGraph};
