//! Method bodies and the per-method shape the state resolver reads.

use crate::{
    assembly::Instruction,
    ir::IrType,
    metadata::{
        signature::{MethodSignature, SourceType},
        token::Token,
    },
    Result,
};

/// A method body as delivered by the binary reader.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// The method's `MethodDef` token
    pub token: Token,
    /// Display name, used in dumps and logs
    pub name: String,
    /// Method signature
    pub signature: MethodSignature,
    /// Declared local variable types, in slot order
    pub locals: Vec<SourceType>,
    /// Instruction stream in offset order
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Creates a method body.
    #[must_use]
    pub fn new(
        token: Token,
        name: impl Into<String>,
        signature: MethodSignature,
        locals: Vec<SourceType>,
        instructions: Vec<Instruction>,
    ) -> Self {
        MethodBody {
            token,
            name: name.into(),
            signature,
            locals,
            instructions,
        }
    }

    /// Method tokens this body calls, in instruction order, duplicates included.
    pub fn call_targets(&self) -> impl Iterator<Item = Token> + '_ {
        self.instructions.iter().filter_map(Instruction::call_target)
    }
}

/// Read-only per-method facts that shape the abstract stack.
///
/// `arguments` is the formal count of the lowered function, so it already
/// includes `this` and the struct-return slot when present.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodShape {
    /// Owning method
    pub method: Token,
    /// Formal argument count including hidden slots
    pub arguments: usize,
    /// Whether a `this` argument is present
    pub has_this: bool,
    /// Whether slot 0 is a struct-return pointer
    pub struct_return: bool,
    /// Resolved formal argument types, in lowered order
    pub param_types: Vec<IrType>,
    /// Resolved local variable types
    pub local_types: Vec<IrType>,
}

impl MethodShape {
    /// Derives the shape of `body`, resolving parameter and local types.
    ///
    /// # Errors
    ///
    /// Fails if a parameter or local type cannot be resolved.
    pub fn from_body(body: &MethodBody) -> Result<Self> {
        let param_types = body
            .signature
            .formal_types()
            .iter()
            .map(IrType::from_source)
            .collect::<Result<Vec<_>>>()?;
        let local_types = body
            .locals
            .iter()
            .map(IrType::from_source)
            .collect::<Result<Vec<_>>>()?;

        Ok(MethodShape {
            method: body.token,
            arguments: body.signature.formal_count(),
            has_this: body.signature.has_this(),
            struct_return: body.signature.has_struct_return(),
            param_types,
            local_types,
        })
    }

    /// Number of declared locals.
    #[must_use]
    pub fn locals(&self) -> usize {
        self.local_types.len()
    }

    /// Depth of the entry state: every argument and local has a slot.
    #[must_use]
    pub fn entry_depth(&self) -> usize {
        self.arguments + self.locals()
    }
}
