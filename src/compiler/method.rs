//! Single-method compilation driver.

use log::debug;

use crate::{
    cfg::{BlockId, CfgBuilder, ControlFlowGraph},
    compiler::{BlockLowering, StackEffectLowering},
    config::{CompilerOptions, TraceFlags},
    ir::{Backend, ValueTable},
    metadata::{token::Token, MethodBody},
    state::{ResolvedStates, State, StateResolver},
    Error, Result,
};

/// Everything produced by compiling one method.
#[derive(Debug, Clone)]
pub struct CompiledMethod {
    /// The method
    pub method: Token,
    /// Display name
    pub name: String,
    /// The method's graph
    pub cfg: ControlFlowGraph,
    /// Entry and exit states per block
    pub states: ResolvedStates,
    /// Parameters, allocas and phis created while resolving
    pub values: ValueTable,
}

impl CompiledMethod {
    /// Entry state of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownState`] if the block was never resolved.
    pub fn entry_state(&self, block: BlockId) -> Result<&State> {
        self.states.entry.get(&block).ok_or(Error::UnknownState(block))
    }

    /// Exit state of `block`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownState`] if the block was never lowered.
    pub fn exit_state(&self, block: BlockId) -> Result<&State> {
        self.states.exit.get(&block).ok_or(Error::UnknownState(block))
    }

    /// The method's entry block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the graph lost the method.
    pub fn entry(&self) -> Result<BlockId> {
        self.cfg
            .find_entry(self.method)
            .ok_or(Error::UnknownMethod(self.method))
    }

    /// Number of phis created across all joins.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.values.phi_count()
    }
}

/// Builds, resolves and lowers methods.
///
/// # Examples
///
/// ```rust
/// use cilflow::{
///     assembly::InstructionAssembler,
///     compiler::MethodCompiler,
///     config::CompilerOptions,
///     metadata::{signature::{MethodSignature, SourceType}, token::Token, MethodBody},
/// };
///
/// let code = InstructionAssembler::new()
///     .ldarg(0)
///     .brtrue("one")
///     .ldc_i4(0)
///     .br("done")
///     .label("one")
///     .ldc_i4(1)
///     .label("done")
///     .ret_value()
///     .finish()?;
/// let body = MethodBody::new(
///     Token::method(1),
///     "Select",
///     MethodSignature::new_static(vec![SourceType::Bool], SourceType::I32),
///     Vec::new(),
///     code,
/// );
///
/// let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
/// assert_eq!(compiled.phi_count(), 2);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub struct MethodCompiler<L = StackEffectLowering> {
    options: CompilerOptions,
    lowering: L,
}

impl MethodCompiler<StackEffectLowering> {
    /// Creates a compiler using [`StackEffectLowering`].
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        MethodCompiler {
            options,
            lowering: StackEffectLowering::new(),
        }
    }
}

impl<L: BlockLowering> MethodCompiler<L> {
    /// Creates a compiler using a custom lowering.
    pub fn with_lowering(options: CompilerOptions, lowering: L) -> Self {
        MethodCompiler { options, lowering }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles `body` into a fresh graph with a fresh [`ValueTable`].
    ///
    /// # Errors
    ///
    /// Any construction, validation, resolution or lowering fault.
    pub fn compile(&mut self, body: &MethodBody) -> Result<CompiledMethod> {
        let mut cfg = ControlFlowGraph::new();
        CfgBuilder::new(&mut cfg, self.options).add_method(body)?;

        let mut values = ValueTable::new();
        let states = self.resolve_in(&cfg, body.token, &mut values)?;
        Ok(CompiledMethod {
            method: body.token,
            name: body.name.clone(),
            cfg,
            states,
            values,
        })
    }

    /// Resolves and lowers `method` inside an existing graph.
    ///
    /// The graph may hold other methods and call edges between them; only
    /// `method`'s blocks are validated and visited.
    ///
    /// # Errors
    ///
    /// Any validation, resolution or lowering fault.
    pub fn resolve_in<B: Backend + ?Sized>(
        &mut self,
        cfg: &ControlFlowGraph,
        method: Token,
        backend: &mut B,
    ) -> Result<ResolvedStates> {
        cfg.validate_method(method)?;
        let order = cfg.reverse_postorder(method)?;
        let mut resolver = StateResolver::new(cfg, method, self.options)?;

        for block in order {
            let entry = resolver.resolve(block, backend)?.clone();
            let exit = self.lowering.lower(cfg.get(block)?, &entry)?;
            resolver.record_exit(block, exit)?;
        }
        let joins = resolver.fill_phis(backend)?;

        if self.options.traces(TraceFlags::JIT) {
            debug!(
                "{}: {} blocks resolved, {} joins filled",
                cfg.method_name(method).unwrap_or("?"),
                cfg.ordered_blocks(method)?.len(),
                joins
            );
        }
        Ok(resolver.into_states())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::InstructionAssembler,
        cfg::BasicBlock,
        metadata::signature::{MethodSignature, SourceType},
    };

    fn body(code: InstructionAssembler, locals: Vec<SourceType>) -> MethodBody {
        MethodBody::new(
            Token::method(1),
            "M",
            MethodSignature::new_static(vec![SourceType::I32], SourceType::I32),
            locals,
            code.finish().unwrap(),
        )
    }

    #[test]
    fn test_custom_lowering_closure() {
        let code = InstructionAssembler::new().ldarg(0).ret_value();
        let mut seen = Vec::new();
        let mut compiler = MethodCompiler::with_lowering(
            CompilerOptions::default(),
            |block: &BasicBlock, entry: &State| -> Result<State> {
                seen.push(block.id());
                Ok(entry.fork())
            },
        );
        let compiled = compiler.compile(&body(code, Vec::new())).unwrap();
        drop(compiler);
        assert_eq!(seen, vec![compiled.entry().unwrap()]);
    }

    #[test]
    fn test_unbalanced_join_is_rejected() {
        // One path leaves an extra value on the stack.
        let code = InstructionAssembler::new()
            .ldarg(0)
            .brtrue("push")
            .br("join")
            .label("push")
            .ldc_i4(1)
            .label("join")
            .ret();
        let err = MethodCompiler::new(CompilerOptions::default())
            .compile(&body(code, Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::StackSizeMismatch { .. }));
    }

    #[test]
    fn test_resolve_in_checks_only_its_method() {
        let named = |token: u32, code: InstructionAssembler| {
            MethodBody::new(
                Token::method(token),
                "M",
                MethodSignature::new_static(Vec::new(), SourceType::Void),
                Vec::new(),
                code.finish().unwrap(),
            )
        };
        let good = named(1, InstructionAssembler::new().ret());
        let dead = named(2, InstructionAssembler::new().ret().nop().ret());

        let mut cfg = ControlFlowGraph::new();
        let mut builder = CfgBuilder::new(&mut cfg, CompilerOptions::default());
        builder.add_method(&good).unwrap();
        builder.add_method(&dead).unwrap();

        let mut compiler = MethodCompiler::new(CompilerOptions::default());
        let mut values = ValueTable::new();
        let states = compiler.resolve_in(&cfg, good.token, &mut values).unwrap();
        assert_eq!(states.order.len(), 1);
        assert!(matches!(
            compiler.resolve_in(&cfg, dead.token, &mut values),
            Err(Error::DeadBlock(_))
        ));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_phi_type_check() {
        let code = || {
            InstructionAssembler::new()
                .ldarg(0)
                .brtrue("real")
                .ldc_i4(0)
                .br("join")
                .label("real")
                .ldc_r8(0.5)
                .label("join")
                .pop()
                .ldarg(0)
                .ret_value()
        };
        let strict = MethodCompiler::new(CompilerOptions::default()).compile(&body(code(), Vec::new()));
        assert!(matches!(strict, Err(Error::PhiTypeMismatch { slot: 1, .. })));

        let relaxed = MethodCompiler::new(CompilerOptions::permissive())
            .compile(&body(code(), Vec::new()))
            .unwrap();
        assert_eq!(relaxed.phi_count(), 2);
    }
}
