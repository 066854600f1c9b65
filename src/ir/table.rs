//! An arena [`Backend`] that records every definition.
//!
//! [`ValueTable`] is what the method driver uses by default. A downstream code
//! generator can walk it to materialise parameters, allocas and phis in its own
//! IR; tests use it to inspect phi operands.

use crate::{
    cfg::BlockId,
    ir::{Backend, IrType, Value, ValueId},
    metadata::token::Token,
    Result,
};

/// What a backend definition is.
#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionKind {
    /// Formal argument of a method
    Param {
        /// Owning method
        method: Token,
        /// Formal index, hidden slots included
        index: usize,
    },
    /// Stack allocation for a struct-typed local
    Alloca {
        /// Block the allocation was requested for
        block: BlockId,
    },
    /// Merge value at the head of a join block
    Phi {
        /// The join block
        block: BlockId,
        /// Incoming `(value, predecessor)` pairs, filled in phase 2
        incoming: Vec<(Value, BlockId)>,
        /// Operand from the method prologue, for phis of an entry block
        prologue: Option<Value>,
    },
}

/// A recorded definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// Result type
    pub ty: IrType,
    /// Definition kind
    pub kind: DefinitionKind,
}

/// Arena of backend definitions addressed by [`ValueId`].
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    defs: Vec<Definition>,
}

impl ValueTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True if nothing has been defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, id: ValueId) -> Option<&Definition> {
        self.defs.get(id.index())
    }

    /// Iterates over all definitions in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &Definition)> + '_ {
        self.defs
            .iter()
            .enumerate()
            .map(|(i, def)| (ValueId::new(i), def))
    }

    /// True if `value` is a phi of this table.
    #[must_use]
    pub fn is_phi(&self, value: &Value) -> bool {
        self.phi_incoming(value).is_some()
    }

    /// Incoming pairs of a phi, or `None` if `value` is not a phi.
    #[must_use]
    pub fn phi_incoming(&self, value: &Value) -> Option<&[(Value, BlockId)]> {
        match &self.get(value.as_def()?)?.kind {
            DefinitionKind::Phi { incoming, .. } => Some(incoming),
            _ => None,
        }
    }

    /// Prologue operand of an entry-block phi.
    #[must_use]
    pub fn phi_prologue(&self, value: &Value) -> Option<&Value> {
        match &self.get(value.as_def()?)?.kind {
            DefinitionKind::Phi { prologue, .. } => prologue.as_ref(),
            _ => None,
        }
    }

    /// Phis placed at the head of `block`, in creation order.
    pub fn phis_in(&self, block: BlockId) -> impl Iterator<Item = ValueId> + '_ {
        self.iter().filter_map(move |(id, def)| match def.kind {
            DefinitionKind::Phi { block: b, .. } if b == block => Some(id),
            _ => None,
        })
    }

    /// Total number of phis.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.defs
            .iter()
            .filter(|def| matches!(def.kind, DefinitionKind::Phi { .. }))
            .count()
    }

    fn define(&mut self, ty: &IrType, kind: DefinitionKind) -> Value {
        let id = ValueId::new(self.defs.len());
        self.defs.push(Definition {
            ty: ty.clone(),
            kind,
        });
        Value::def(id, ty.clone())
    }
}

impl Backend for ValueTable {
    fn param(&mut self, method: Token, index: usize, ty: &IrType) -> Result<Value> {
        Ok(self.define(ty, DefinitionKind::Param { method, index }))
    }

    fn alloca(&mut self, block: BlockId, ty: &IrType) -> Result<Value> {
        // The slot holds the address, not the aggregate
        let id = ValueId::new(self.defs.len());
        self.defs.push(Definition {
            ty: ty.clone(),
            kind: DefinitionKind::Alloca { block },
        });
        Ok(Value::def(id, IrType::Pointer))
    }

    fn phi(&mut self, block: BlockId, ty: &IrType) -> Result<Value> {
        Ok(self.define(
            ty,
            DefinitionKind::Phi {
                block,
                incoming: Vec::new(),
                prologue: None,
            },
        ))
    }

    fn add_incoming(&mut self, phi: &Value, incoming: &[(Value, BlockId)]) -> Result<()> {
        let id = phi
            .as_def()
            .ok_or_else(|| malformed_error!("Constant {} used as a phi", phi))?;
        match self.defs.get_mut(id.index()).map(|def| &mut def.kind) {
            Some(DefinitionKind::Phi { incoming: list, .. }) => {
                list.extend_from_slice(incoming);
                Ok(())
            }
            _ => Err(malformed_error!("Value {} is not a phi", phi)),
        }
    }

    fn add_prologue_incoming(&mut self, phi: &Value, value: Value) -> Result<()> {
        let id = phi
            .as_def()
            .ok_or_else(|| malformed_error!("Constant {} used as a phi", phi))?;
        match self.defs.get_mut(id.index()).map(|def| &mut def.kind) {
            Some(DefinitionKind::Phi { prologue, .. }) if prologue.is_none() => {
                *prologue = Some(value);
                Ok(())
            }
            Some(DefinitionKind::Phi { .. }) => {
                Err(malformed_error!("Phi {} already has a prologue operand", phi))
            }
            _ => Err(malformed_error!("Value {} is not a phi", phi)),
        }
    }
}
