//! The seam between the compiler core and the target-IR code generator.

use crate::{
    cfg::BlockId,
    ir::{IrType, Value},
    metadata::token::Token,
    Result,
};

/// Factory for backend-owned SSA definitions.
///
/// The state resolver calls into the backend for a parameter value per formal
/// argument of a method entry, a stack allocation per struct-typed local, a phi
/// per stack slot of a join block and, in the second phase, the incoming
/// operands of those phis. Everything else (constants, copies of predecessor
/// states) the core handles itself.
///
/// An entry block that is also a loop header is a join of its back edges and
/// the method's prologue. Its phis get the prologue's parameter or zeroed local
/// through [`Backend::add_prologue_incoming`]; a backend that emits real code
/// usually places those values in a separate prologue block.
///
/// Implementations must hand out distinct definitions for every call; the core
/// relies on value identity to tell phis apart.
pub trait Backend {
    /// Returns the value of formal argument `index` of `method`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn param(&mut self, method: Token, index: usize, ty: &IrType) -> Result<Value>;

    /// Creates a stack allocation of `ty` for `block` and returns its address.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn alloca(&mut self, block: BlockId, ty: &IrType) -> Result<Value>;

    /// Creates an empty phi of type `ty` at the head of `block`.
    ///
    /// # Errors
    ///
    /// Implementation-defined.
    fn phi(&mut self, block: BlockId, ty: &IrType) -> Result<Value>;

    /// Appends `(value, predecessor)` pairs to a phi created by [`Backend::phi`].
    ///
    /// # Errors
    ///
    /// Fails if `phi` is not a phi created by this backend.
    fn add_incoming(&mut self, phi: &Value, incoming: &[(Value, BlockId)]) -> Result<()>;

    /// Sets the operand a phi of an entry block receives from the method's
    /// prologue, i.e. on first entry rather than along a back edge.
    ///
    /// # Errors
    ///
    /// Fails if `phi` is not a phi created by this backend.
    fn add_prologue_incoming(&mut self, phi: &Value, value: Value) -> Result<()>;
}
