//! Entry-state resolution and the two-phase phi protocol.
//!
//! Blocks of one method are resolved in reverse postorder over intraprocedural
//! edges. Resolving a block computes its entry state from its predecessors' exit
//! states; the caller lowers the block and hands the exit state back through
//! [`StateResolver::record_exit`]. A join block gets one phi per stack slot when
//! it is resolved, shaped after the first predecessor that already has an exit
//! state. Loop back edges are not known at that point, so the phi operands are
//! added in a second phase by [`StateResolver::fill_phis`], once every block has
//! been lowered.
//!
//! An entry block that is a loop header is a join too: the parameters and zeroed
//! locals form a virtual prologue predecessor, and the back edges supply the
//! other operands.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::{
    cfg::{BlockId, ControlFlowGraph},
    config::{CompilerOptions, TraceFlags},
    ir::{Backend, IrType, TypeKind, Value},
    metadata::{token::Token, MethodShape},
    state::{Section, State},
    Error, Result,
};

/// Entry and exit states of every resolved block of one method.
#[derive(Debug, Clone, Default)]
pub struct ResolvedStates {
    /// Blocks in the order they were resolved
    pub order: Vec<BlockId>,
    /// Entry state per block
    pub entry: HashMap<BlockId, State>,
    /// Exit state per lowered block
    pub exit: HashMap<BlockId, State>,
    /// Join blocks whose phis were filled, in fill order
    pub joins: Vec<BlockId>,
}

/// Computes abstract stack states for the blocks of one method.
///
/// # Examples
///
/// ```rust
/// use cilflow::{
///     assembly::InstructionAssembler,
///     cfg::{CfgBuilder, ControlFlowGraph},
///     config::CompilerOptions,
///     ir::ValueTable,
///     metadata::{signature::{MethodSignature, SourceType}, token::Token, MethodBody},
///     state::StateResolver,
/// };
///
/// let code = InstructionAssembler::new().ldarg(0).stloc(0).ret().finish()?;
/// let body = MethodBody::new(
///     Token::method(1),
///     "Store",
///     MethodSignature::new_static(vec![SourceType::I32], SourceType::Void),
///     vec![SourceType::I32],
///     code,
/// );
/// let mut cfg = ControlFlowGraph::new();
/// let entry = CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
///
/// let mut values = ValueTable::new();
/// let mut resolver = StateResolver::new(&cfg, body.token, CompilerOptions::default())?;
/// let state = resolver.resolve(entry, &mut values)?;
/// assert_eq!(state.depth(), 2);
/// assert_eq!(state.locals().base(), 1);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub struct StateResolver<'a> {
    cfg: &'a ControlFlowGraph,
    method: Token,
    shape: &'a MethodShape,
    options: CompilerOptions,
    visited: HashSet<BlockId>,
    states: ResolvedStates,
    pending: Vec<BlockId>,
    prologue: Option<State>,
}

impl<'a> StateResolver<'a> {
    /// Creates a resolver for `method`, which must be in `cfg` with a known shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no entry or no shape.
    pub fn new(cfg: &'a ControlFlowGraph, method: Token, options: CompilerOptions) -> Result<Self> {
        cfg.find_entry(method).ok_or(Error::UnknownMethod(method))?;
        let shape = cfg.shape(method).ok_or(Error::UnknownMethod(method))?;
        Ok(StateResolver {
            cfg,
            method,
            shape,
            options,
            visited: HashSet::new(),
            states: ResolvedStates::default(),
            pending: Vec::new(),
            prologue: None,
        })
    }

    /// The method being resolved.
    #[must_use]
    pub fn method(&self) -> Token {
        self.method
    }

    /// Resolves the entry state of `block`.
    ///
    /// Resolving an already visited block returns the recorded state without
    /// touching the backend again.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownBlock`] if `block` is not in the graph
    /// - [`Error::Malformed`] if `block` belongs to another method, or its shape
    ///   counts a hidden return slot without any argument
    /// - [`Error::InterproceduralEdge`] if a non-entry block is reached from
    ///   another method
    /// - [`Error::DeadBlock`] for a non-entry block without predecessors
    /// - [`Error::UnresolvedTemplate`] if no predecessor has an exit state yet
    /// - [`Error::StackSizeMismatch`] if resolved predecessors disagree
    /// - [`Error::UnhandledType`] for a local whose type cannot be zeroed
    /// - any error the backend reports
    pub fn resolve<B: Backend + ?Sized>(&mut self, block: BlockId, backend: &mut B) -> Result<&State> {
        if self.visited.contains(&block) {
            return self.entry_state(block);
        }

        let data = self.cfg.get(block)?;
        if data.method() != self.method {
            return Err(malformed_error!(
                "Block {} belongs to {}, not {}",
                block,
                data.method(),
                self.method
            ));
        }

        let state = if data.is_entry() {
            self.resolve_entry(block, backend)?
        } else {
            self.resolve_inner(block, backend)?
        };

        if self.options.traces(TraceFlags::STATE) {
            debug!("{} entry state\n{}", block, state.trace("    "));
        }
        self.visited.insert(block);
        self.states.order.push(block);
        Ok(self.states.entry.entry(block).or_insert(state))
    }

    fn resolve_entry<B: Backend + ?Sized>(&mut self, block: BlockId, backend: &mut B) -> Result<State> {
        let seed = self.prologue_state(block, backend)?;
        let looped = self
            .cfg
            .predecessor_edges(block)
            .any(|(_, edge)| !edge.is_interprocedural());
        if !looped {
            return Ok(seed);
        }

        let state = join_state(block, &seed, backend)?;
        if self.options.traces(TraceFlags::STATE) {
            trace!("{} is a loop header, {} prologue phis", block, state.phis.len());
        }
        self.prologue = Some(seed);
        self.pending.push(block);
        Ok(state)
    }

    fn prologue_state<B: Backend + ?Sized>(&self, block: BlockId, backend: &mut B) -> Result<State> {
        let shape = self.shape;
        if shape.param_types.len() != shape.arguments {
            return Err(malformed_error!(
                "{} declares {} arguments but {} argument types",
                self.method,
                shape.arguments,
                shape.param_types.len()
            ));
        }

        let mut state = State::default();
        for (index, ty) in shape.param_types.iter().enumerate() {
            let value = backend.param(self.method, index, ty)?;
            state.stack.push(value);
        }

        let mut offset = 0;
        state.struct_ret = Section::new(offset, usize::from(shape.struct_return));
        offset += state.struct_ret.len();
        state.this = Section::new(offset, usize::from(shape.has_this));
        offset += state.this.len();
        let base = if shape.has_this { offset - 1 } else { offset };
        let len = shape
            .arguments
            .checked_sub(usize::from(shape.struct_return))
            .ok_or_else(|| {
                malformed_error!(
                    "{} has a struct return slot but {} arguments",
                    self.method,
                    shape.arguments
                )
            })?;
        state.arguments = Section::new(base, len);

        let locals_base = state.stack.len();
        for ty in &shape.local_types {
            state.stack.push(zero_value(block, ty, backend)?);
        }
        state.locals = Section::new(locals_base, shape.locals());

        while state.stack.len() < shape.entry_depth() {
            state.stack.push(Value::i32_zero());
        }
        Ok(state)
    }

    fn resolve_inner<B: Backend + ?Sized>(&mut self, block: BlockId, backend: &mut B) -> Result<State> {
        let mut predecessors = Vec::new();
        for (from, edge) in self.cfg.predecessor_edges(block) {
            if edge.is_interprocedural() {
                return Err(Error::InterproceduralEdge { from, to: block });
            }
            predecessors.push(from);
        }

        match predecessors.as_slice() {
            [] => Err(Error::DeadBlock(block)),
            [single] => self
                .states
                .exit
                .get(single)
                .map(State::fork)
                .ok_or(Error::UnresolvedTemplate(block)),
            many => {
                let mut resolved = many.iter().filter_map(|p| self.states.exit.get(p));
                let template = resolved.next().ok_or(Error::UnresolvedTemplate(block))?;
                for other in resolved {
                    check_agreement(block, template, other)?;
                }

                let state = join_state(block, template, backend)?;
                if self.options.traces(TraceFlags::STATE) {
                    trace!(
                        "{} joins {} predecessors, {} phis",
                        block,
                        many.len(),
                        state.phis.len()
                    );
                }
                self.pending.push(block);
                Ok(state)
            }
        }
    }

    /// Records the exit state of a resolved block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownState`] if `block` has not been resolved.
    pub fn record_exit(&mut self, block: BlockId, state: State) -> Result<()> {
        if !self.visited.contains(&block) {
            return Err(Error::UnknownState(block));
        }
        if self.options.traces(TraceFlags::STATE) {
            debug!("{} exit state\n{}", block, state.trace("    "));
        }
        self.states.exit.insert(block, state);
        Ok(())
    }

    /// Entry state of a resolved block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownState`] if `block` has not been resolved.
    pub fn entry_state(&self, block: BlockId) -> Result<&State> {
        self.states.entry.get(&block).ok_or(Error::UnknownState(block))
    }

    /// Exit state of a lowered block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownState`] if no exit state was recorded.
    pub fn exit_state(&self, block: BlockId) -> Result<&State> {
        self.states.exit.get(&block).ok_or(Error::UnknownState(block))
    }

    /// Join blocks still waiting for their phi operands.
    #[must_use]
    pub fn pending_joins(&self) -> &[BlockId] {
        &self.pending
    }

    /// Adds the incoming operands of every pending join's phis.
    ///
    /// For each join, intraprocedural predecessors are taken in edge order and
    /// each contributes one `(value, predecessor)` pair per phi. The phis of a
    /// looping entry block also get their prologue operand. Every join is filled
    /// once; the pending list is empty afterwards. Returns the number of joins
    /// filled.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownState`] if a predecessor has no exit state
    /// - [`Error::StackSizeMismatch`] if a predecessor's depth differs from the
    ///   join's phi count
    /// - [`Error::PhiTypeMismatch`] if type checking is enabled and an operand's
    ///   type differs from its phi's
    /// - any error the backend reports
    pub fn fill_phis<B: Backend + ?Sized>(&mut self, backend: &mut B) -> Result<usize> {
        let pending = std::mem::take(&mut self.pending);
        let mut filled = 0;
        for join in pending {
            let phis = self.entry_state(join)?.phis.clone();
            if self.cfg.get(join)?.is_entry() {
                let seed = self.prologue.take().ok_or(Error::UnknownState(join))?;
                for (phi, value) in phis.iter().zip(seed.stack.iter()) {
                    backend.add_prologue_incoming(phi, value.clone())?;
                }
            }

            let cfg = self.cfg;
            for (from, edge) in cfg.predecessor_edges(join) {
                if edge.is_interprocedural() {
                    continue;
                }
                let exit = self.exit_state(from)?;
                if exit.depth() != phis.len() {
                    return Err(Error::StackSizeMismatch {
                        block: join,
                        expected: phis.len(),
                        found: exit.depth(),
                    });
                }
                for (slot, (phi, value)) in phis.iter().zip(exit.stack.iter()).enumerate() {
                    if self.options.verify_phi_types && phi.ty() != value.ty() {
                        return Err(Error::PhiTypeMismatch {
                            block: join,
                            slot,
                            from,
                            expected: phi.ty().to_string(),
                            found: value.ty().to_string(),
                        });
                    }
                    backend.add_incoming(phi, &[(value.clone(), from)])?;
                }
            }
            if self.options.traces(TraceFlags::STATE) {
                trace!("filled {} phis of {}", phis.len(), join);
            }
            self.states.joins.push(join);
            filled += 1;
        }
        Ok(filled)
    }

    /// Consumes the resolver and returns every recorded state.
    #[must_use]
    pub fn into_states(self) -> ResolvedStates {
        self.states
    }
}

/// A copy of `template` whose every slot is a fresh phi shaped after it.
fn join_state<B: Backend + ?Sized>(block: BlockId, template: &State, backend: &mut B) -> Result<State> {
    let mut state = State {
        stack: crate::state::AbstractStack::with_capacity(template.depth()),
        ..template.fork()
    };
    for value in template.stack.iter() {
        let phi = backend.phi(block, value.ty())?;
        state.stack.push(phi.clone());
        state.phis.push(phi);
    }
    Ok(state)
}

fn zero_value<B: Backend + ?Sized>(block: BlockId, ty: &IrType, backend: &mut B) -> Result<Value> {
    match ty.kind() {
        TypeKind::Pointer => Ok(Value::null(ty.clone())),
        TypeKind::Float => Ok(Value::const_real(ty.clone(), 0.0)),
        TypeKind::Integer => Ok(Value::const_int(ty.clone(), 0)),
        TypeKind::Struct => backend.alloca(block, ty),
        TypeKind::Void | TypeKind::Array | TypeKind::Function => {
            Err(Error::UnhandledType(ty.to_string()))
        }
    }
}

fn check_agreement(block: BlockId, template: &State, other: &State) -> Result<()> {
    if template.depth() != other.depth() {
        return Err(Error::StackSizeMismatch {
            block,
            expected: template.depth(),
            found: other.depth(),
        });
    }
    for (expected, found) in template.sections().iter().zip(other.sections().iter()) {
        if expected != found {
            let (expected, found) = if expected.end() == found.end() {
                (expected.base(), found.base())
            } else {
                (expected.end(), found.end())
            };
            return Err(Error::StackSizeMismatch {
                block,
                expected,
                found,
            });
        }
    }
    Ok(())
}
