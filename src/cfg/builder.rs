//! Partitioning of method bodies into basic blocks.
//!
//! A method enters the graph as a single block holding its whole instruction
//! stream. The builder then splits that block at every leader (the instruction
//! after a terminator, every branch or switch target, and optionally the
//! instruction after a call) in ascending offset order. Fallthrough edges come
//! from the split rule; explicit branch, switch and call-return edges are wired
//! once all splits are done, so no edge has to be moved more than necessary.

use std::collections::BTreeSet;

use log::debug;

use crate::{
    assembly::{FlowControl, Operand},
    cfg::{BlockId, ControlFlowGraph, EdgeKind},
    config::{CompilerOptions, TraceFlags},
    metadata::{MethodBody, MethodShape},
    Result,
};

/// Adds methods to a [`ControlFlowGraph`].
///
/// # Examples
///
/// ```rust
/// use cilflow::{
///     assembly::InstructionAssembler,
///     cfg::{CfgBuilder, ControlFlowGraph},
///     config::CompilerOptions,
///     metadata::{signature::{MethodSignature, SourceType}, token::Token, MethodBody},
/// };
///
/// let code = InstructionAssembler::new()
///     .ldarg(0)
///     .brtrue("skip")
///     .nop()
///     .label("skip")
///     .ret()
///     .finish()?;
/// let body = MethodBody::new(
///     Token::method(1),
///     "Skip",
///     MethodSignature::new_static(vec![SourceType::Bool], SourceType::Void),
///     Vec::new(),
///     code,
/// );
///
/// let mut cfg = ControlFlowGraph::new();
/// let entry = CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
/// assert_eq!(cfg.ordered_blocks(body.token)?.len(), 3);
/// assert_eq!(cfg.successors(entry).count(), 2);
/// # Ok::<(), cilflow::Error>(())
/// ```
pub struct CfgBuilder<'a> {
    cfg: &'a mut ControlFlowGraph,
    options: CompilerOptions,
}

impl<'a> CfgBuilder<'a> {
    /// Creates a builder adding to `cfg`.
    pub fn new(cfg: &'a mut ControlFlowGraph, options: CompilerOptions) -> Self {
        cfg.set_trace(options.trace);
        CfgBuilder { cfg, options }
    }

    /// Adds `body` and returns its entry block.
    ///
    /// Adding a method that is already present returns the existing entry.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Malformed`] for an empty body, non-increasing offsets or
    ///   a branch target that is not an instruction boundary
    /// - any error from resolving the method's parameter and local types
    pub fn add_method(&mut self, body: &MethodBody) -> Result<BlockId> {
        if let Some(entry) = self.cfg.find_entry(body.token) {
            return Ok(entry);
        }
        let Some(first) = body.instructions.first() else {
            return Err(malformed_error!("Method {} has an empty body", body.name));
        };
        if body
            .instructions
            .windows(2)
            .any(|pair| pair[1].offset < pair[0].next_offset())
        {
            return Err(malformed_error!(
                "Method {} has overlapping or unordered instructions",
                body.name
            ));
        }

        let starts: BTreeSet<u64> = body.instructions.iter().map(|i| i.offset).collect();
        let mut leaders = BTreeSet::new();
        for instruction in &body.instructions {
            for &target in &instruction.branch_targets {
                if !starts.contains(&target) {
                    return Err(malformed_error!(
                        "Branch at IL_{:04x} in {} targets IL_{:04x}, which is not an instruction",
                        instruction.offset,
                        body.name,
                        target
                    ));
                }
                leaders.insert(target);
            }
            let ends = instruction.is_terminal()
                || (self.options.split_at_calls && instruction.flow == FlowControl::Call);
            if ends && starts.contains(&instruction.next_offset()) {
                leaders.insert(instruction.next_offset());
            }
        }
        leaders.remove(&first.offset);

        let shape = MethodShape::from_body(body)?;
        let method = body.token;
        let entry = self.cfg.add_vertex(method, first.offset);
        self.cfg.set_method_name(method, &body.name);
        self.cfg.set_shape(shape)?;
        {
            let block = self.cfg.block_mut(entry)?;
            block.instructions = body.instructions.clone();
            for instruction in &mut block.instructions {
                instruction.block = Some(entry);
            }
        }

        for &leader in &leaders {
            let Some(block) = self.cfg.find_block_at(method, leader) else {
                continue;
            };
            let index = self
                .cfg
                .get(block)?
                .instructions()
                .iter()
                .position(|i| i.offset == leader);
            if let Some(index) = index.filter(|&i| i > 0) {
                self.cfg.split(block, index)?;
            }
        }

        self.wire_explicit_edges(body)?;

        if self.options.traces(TraceFlags::CFG_CONSTRUCTION) {
            debug!(
                "{} partitioned into {} blocks",
                body.name,
                self.cfg.ordered_blocks(method)?.len()
            );
        }
        if self.options.traces(TraceFlags::GRAPH) {
            debug!("{}", self.cfg.to_text());
        }
        if self.options.traces(TraceFlags::DOT) {
            debug!("{}", self.cfg.to_dot());
        }
        if self.options.link_calls {
            self.link_calls()?;
        }
        Ok(entry)
    }

    fn wire_explicit_edges(&mut self, body: &MethodBody) -> Result<()> {
        let method = body.token;
        let layout = self.cfg.ordered_blocks(method)?.to_vec();
        for block in layout {
            let Some(last) = self.cfg.get(block)?.last().cloned() else {
                continue;
            };

            let kind = match (&last.operand, last.flow) {
                (Operand::Switch(_), _) => EdgeKind::Switch,
                (_, FlowControl::Branch) => EdgeKind::Branch,
                _ => EdgeKind::Conditional,
            };
            for target in &last.branch_targets {
                if let Some(to) = self.cfg.find_block_at(method, *target) {
                    self.cfg.add_edge(block, to, kind)?;
                }
            }

            // A call or debugger break that ends a block resumes at the next one.
            let resume = match last.flow {
                FlowControl::Call => Some(EdgeKind::CallReturn),
                FlowControl::Break | FlowControl::Meta => Some(EdgeKind::Fallthrough),
                _ => None,
            };
            if let Some(kind) = resume {
                if let Some(next) = self.cfg.find_block_at(method, last.next_offset()) {
                    self.cfg.add_edge(block, next, kind)?;
                }
            }
        }
        Ok(())
    }

    /// Adds a call edge from every block containing a call to the callee's
    /// entry, for callees already in the graph. Recursive calls get no edge and
    /// existing call edges are not duplicated.
    ///
    /// Returns the number of edges added.
    ///
    /// # Errors
    ///
    /// Propagates graph errors.
    pub fn link_calls(&mut self) -> Result<usize> {
        let mut pending = Vec::new();
        for block in self.cfg.blocks() {
            let callees = block.instructions().iter().filter_map(|i| i.call_target());
            for callee in callees.filter(|&c| c != block.method()) {
                if let Some(entry) = self.cfg.find_entry(callee) {
                    if !pending.contains(&(block.id(), entry)) {
                        pending.push((block.id(), entry));
                    }
                }
            }
        }

        let mut added = 0;
        for (from, to) in pending {
            if self.cfg.successors(from).any(|s| s == to) {
                continue;
            }
            self.cfg.add_edge(from, to, EdgeKind::Call)?;
            added += 1;
        }
        if added > 0 && self.options.traces(TraceFlags::CFG_CONSTRUCTION) {
            debug!("linked {} call edges", added);
        }
        Ok(added)
    }
}
