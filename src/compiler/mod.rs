//! Method compilation: resolution order, lowering and the two-phase phi fill.
//!
//! ```text
//!   MethodBody ──► CfgBuilder ──► reverse postorder
//!                                     │
//!                 ┌───────────────────┘
//!                 ▼
//!   StateResolver::resolve ──► BlockLowering::lower ──► record_exit
//!                 │                                        │
//!                 └──────────── next block ◄───────────────┘
//!                                     │
//!                                     ▼
//!                         StateResolver::fill_phis
//! ```
//!
//! # Key Components
//!
//! - [`MethodCompiler`] / [`CompiledMethod`] - Single-method driver and its result
//! - [`BlockLowering`] - Seam for code generators
//! - [`StackEffectLowering`] - Reference lowering tracking values only
//! - [`discover_callees`] - Transitive call discovery into a shared graph
//! - [`compile_methods`] - Parallel driver over independent methods

mod discovery;
mod lowering;
mod method;
mod parallel;

pub use discovery::{discover_callees, Discovery};
pub use lowering::{BlockLowering, StackEffectLowering};
pub use method::{CompiledMethod, MethodCompiler};
pub use parallel::compile_methods;
