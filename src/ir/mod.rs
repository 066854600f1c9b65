//! Target-IR abstraction: types, values and the backend seam.
//!
//! # Key Components
//!
//! - [`IrType`] / [`TypeKind`] - Resolved target types
//! - [`Value`] - Constant or backend-definition handle held in stack slots
//! - [`Backend`] - Factory for parameters, allocas and phis
//! - [`ValueTable`] - Recording arena implementation of [`Backend`]

mod backend;
mod table;
mod types;
mod value;

pub use backend::Backend;
pub use table::{Definition, DefinitionKind, ValueTable};
pub use types::{IrType, TypeKind};
pub use value::{Constant, Value, ValueId, ValueKind};
