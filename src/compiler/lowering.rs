//! Per-block lowering seam.

use log::trace;

use crate::{
    assembly::{Immediate, Instruction, Operand, ResultType},
    cfg::BasicBlock,
    ir::{IrType, TypeKind, Value},
    state::{Section, State},
    Error, Result,
};

/// Turns a block's entry state into its exit state.
///
/// The method driver calls this once per block in reverse postorder, after the
/// entry state is resolved. A code generator implements it to emit the block's
/// instructions; the returned state is what successors will see.
pub trait BlockLowering {
    /// Lowers `block` starting from `entry`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; any error aborts the method.
    fn lower(&mut self, block: &BasicBlock, entry: &State) -> Result<State>;
}

impl<F> BlockLowering for F
where
    F: FnMut(&BasicBlock, &State) -> Result<State>,
{
    fn lower(&mut self, block: &BasicBlock, entry: &State) -> Result<State> {
        self(block, entry)
    }
}

/// Reference lowering that tracks values without emitting code.
///
/// Argument and local loads push the slot's current value and stores overwrite
/// it; integer and real constants push typed constants; `dup` copies the top.
/// Every other instruction pops its declared operands and pushes opaque zero
/// results of its [`ResultType`], so a join of `i64` arithmetic sees `i64` on
/// every path. Popping into the locals section is a [`Error::StackUnderflow`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StackEffectLowering;

impl StackEffectLowering {
    /// Creates the lowering.
    #[must_use]
    pub fn new() -> Self {
        StackEffectLowering
    }

    fn pop(block: &BasicBlock, state: &mut State) -> Result<Value> {
        let floor = state.locals().end();
        let depth = state.depth();
        if depth <= floor {
            return Err(Error::StackUnderflow {
                block: block.id(),
                depth,
                floor,
            });
        }
        state.stack_mut().pop().ok_or(Error::StackUnderflow {
            block: block.id(),
            depth,
            floor,
        })
    }

    fn opaque(ty: IrType) -> Value {
        match ty.kind() {
            TypeKind::Integer => Value::const_int(ty, 0),
            TypeKind::Float => Value::const_real(ty, 0.0),
            TypeKind::Pointer => Value::null(ty),
            _ => Value::zero(ty),
        }
    }

    fn slot(section: Section, index: u16, what: &str, instruction: &Instruction) -> Result<usize> {
        section.slot(usize::from(index)).ok_or_else(|| {
            malformed_error!(
                "{} {} out of range at IL_{:04x} ({} declared)",
                what,
                index,
                instruction.offset,
                section.len()
            )
        })
    }

    fn step(block: &BasicBlock, state: &mut State, instruction: &Instruction) -> Result<()> {
        let behavior = instruction.stack_behavior;
        match (&instruction.operand, behavior.pops, behavior.pushes) {
            (Operand::Argument(index), 0, 1) => {
                let slot = Self::slot(state.arguments(), *index, "argument", instruction)?;
                let value = state.stack().get(slot).cloned();
                if let Some(value) = value {
                    state.stack_mut().push(value);
                }
            }
            (Operand::Argument(index), 1, 0) => {
                let slot = Self::slot(state.arguments(), *index, "argument", instruction)?;
                let value = Self::pop(block, state)?;
                state.stack_mut().set(slot, value);
            }
            (Operand::Local(index), 0, 1) => {
                let slot = Self::slot(state.locals(), *index, "local", instruction)?;
                let value = state.stack().get(slot).cloned();
                if let Some(value) = value {
                    state.stack_mut().push(value);
                }
            }
            (Operand::Local(index), 1, 0) => {
                let slot = Self::slot(state.locals(), *index, "local", instruction)?;
                let value = Self::pop(block, state)?;
                state.stack_mut().set(slot, value);
            }
            (Operand::Immediate(imm), 0, 1) => {
                let value = match imm {
                    Immediate::Int32(v) => Value::const_int(IrType::I32, i64::from(*v)),
                    Immediate::Int64(v) => Value::const_int(IrType::Int(64), *v),
                    Immediate::Float64(v) => Value::const_real(IrType::F64, *v),
                };
                state.stack_mut().push(value);
            }
            _ if instruction.mnemonic == "dup" => {
                let top = Self::pop(block, state)?;
                state.stack_mut().push(top.clone());
                state.stack_mut().push(top);
            }
            (_, pops, pushes) => {
                // The last value popped is the deepest operand.
                let mut deepest = None;
                for _ in 0..pops {
                    deepest = Some(Self::pop(block, state)?);
                }
                let ty = match &instruction.result {
                    ResultType::Int32 => IrType::I32,
                    ResultType::Fixed(ty) => ty.clone(),
                    ResultType::FromOperand => deepest.map_or(IrType::I32, |v| v.ty().clone()),
                };
                for _ in 0..pushes {
                    state.stack_mut().push(Self::opaque(ty.clone()));
                }
            }
        }
        Ok(())
    }
}

impl BlockLowering for StackEffectLowering {
    fn lower(&mut self, block: &BasicBlock, entry: &State) -> Result<State> {
        let mut state = entry.fork();
        for instruction in block.instructions() {
            Self::step(block, &mut state, instruction)?;
        }
        trace!(
            "{}: depth {} -> {}",
            block.id(),
            entry.depth(),
            state.depth()
        );
        Ok(state)
    }
}
