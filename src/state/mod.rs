//! Abstract stack states and their resolution into SSA values.
//!
//! Every block boundary carries a [`State`]: the abstract stack holding the
//! method's arguments, locals and in-flight operands, plus the sections naming
//! where each group lives. [`StateResolver`] computes entry states from
//! predecessor exit states and places phi placeholders at joins.
//!
//! # Key Components
//!
//! - [`AbstractStack`] - Index-addressable value sequence
//! - [`Section`] - `(base, len)` view into a stack
//! - [`State`] - Stack plus struct-return, `this`, argument and local sections
//! - [`StateResolver`] - Entry-state computation and two-phase phi fill

mod frame;
mod resolver;
mod section;
mod stack;

pub use frame::State;
pub use resolver::{ResolvedStates, StateResolver};
pub use section::Section;
pub use stack::AbstractStack;
