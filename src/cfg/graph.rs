//! The whole-program control flow graph.
//!
//! One [`ControlFlowGraph`] holds the blocks of every method added to it. Blocks
//! and edges live in an arena ([`DirectedGraph`]) addressed by [`BlockId`] and
//! [`EdgeId`]. Per method the graph records an entry block, the ordered block list
//! (carried by the entry block), the method's name and, once known, its
//! [`MethodShape`].
//!
//! Blocks are named by `(method, offset)`. [`ControlFlowGraph::add_vertex`] is
//! idempotent on that name and records every block it creates in all open change
//! sets, so callers can learn which blocks a construction step produced.

use std::{collections::HashMap, fmt};

use log::debug;

use crate::{
    assembly::ImplicitEdge,
    cfg::{BasicBlock, BlockId, CfgEdge, EdgeKind},
    config::TraceFlags,
    metadata::{token::Token, MethodShape},
    utils::graph::{
        algorithms::{dfs, reverse_postorder},
        DirectedGraph, EdgeId, GraphBase, Successors,
    },
    Error, Result,
};

/// Handle of an open change set.
///
/// Tokens come from a graph-local counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangeSetToken(u32);

impl From<u32> for ChangeSetToken {
    fn from(value: u32) -> Self {
        ChangeSetToken(value)
    }
}

impl fmt::Display for ChangeSetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cs{}", self.0)
    }
}

/// Per-method bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct MethodInfo {
    pub(crate) name: String,
    pub(crate) entry: BlockId,
    pub(crate) shape: Option<MethodShape>,
}

/// Control flow graph of basic blocks across all methods.
///
/// # Examples
///
/// ```rust
/// use cilflow::{cfg::ControlFlowGraph, metadata::token::Token};
///
/// let mut cfg = ControlFlowGraph::new();
/// let changes = cfg.start_change_set();
/// let entry = cfg.add_vertex(Token::method(1), 0);
/// assert_eq!(cfg.add_vertex(Token::method(1), 0), entry);
/// assert_eq!(cfg.pop_change_set(changes)?, vec![entry]);
/// assert!(cfg.is_entry(entry));
/// # Ok::<(), cilflow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    graph: DirectedGraph<BasicBlock, CfgEdge>,
    names: HashMap<(Token, u64), BlockId>,
    methods: HashMap<Token, MethodInfo>,
    method_order: Vec<Token>,
    change_sets: HashMap<ChangeSetToken, Vec<BlockId>>,
    next_change_set: u32,
    trace: TraceFlags,
}

impl ControlFlowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the trace flags consulted for construction logging.
    #[must_use]
    pub fn with_trace(mut self, trace: TraceFlags) -> Self {
        self.trace = trace;
        self
    }

    pub(crate) fn set_trace(&mut self, trace: TraceFlags) {
        self.trace = trace;
    }

    /// Trace flags in effect.
    #[must_use]
    pub fn trace(&self) -> TraceFlags {
        self.trace
    }

    /// Opens a change set and returns its token.
    ///
    /// Every block created while the set is open is recorded in it, once.
    pub fn start_change_set(&mut self) -> ChangeSetToken {
        let token = ChangeSetToken(self.next_change_set);
        self.next_change_set += 1;
        self.change_sets.insert(token, Vec::new());
        token
    }

    /// Closes a change set and returns the blocks created while it was open, in
    /// creation order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownChangeSet`] if `token` is not open.
    pub fn pop_change_set(&mut self, token: ChangeSetToken) -> Result<Vec<BlockId>> {
        self.change_sets
            .remove(&token)
            .ok_or(Error::UnknownChangeSet(token))
    }

    /// Returns the block named `(method, offset)`, creating it if necessary.
    ///
    /// The first block created for a method becomes its entry; later blocks are
    /// appended to the method's ordered block list. A created block starts out
    /// empty and is recorded in every open change set.
    pub fn add_vertex(&mut self, method: Token, offset: u64) -> BlockId {
        if let Some(&existing) = self.names.get(&(method, offset)) {
            return existing;
        }
        self.create_block(method, offset, None)
    }

    fn create_block(&mut self, method: Token, offset: u64, after: Option<BlockId>) -> BlockId {
        let id = BlockId::new(self.graph.node_count());
        let entry = self.methods.get(&method).map_or(id, |info| info.entry);
        let mut block = BasicBlock::new(id, method, entry, offset);

        if entry == id {
            block.layout.push(id);
            self.methods.insert(
                method,
                MethodInfo {
                    name: method.to_string(),
                    entry: id,
                    shape: None,
                },
            );
            self.method_order.push(method);
        }
        self.graph.add_node(block);

        if entry != id {
            if let Some(layout) = self.graph.node_mut(entry).map(|e| &mut e.layout) {
                match after.and_then(|a| layout.iter().position(|&b| b == a)) {
                    Some(pos) => layout.insert(pos + 1, id),
                    None => layout.push(id),
                }
            }
        }

        self.names.insert((method, offset), id);
        for blocks in self.change_sets.values_mut() {
            blocks.push(id);
        }

        if self.trace.contains(TraceFlags::CFG_CONSTRUCTION) {
            debug!("created {} for {} at IL_{:04x}", id, method, offset);
        }
        id
    }

    /// Records the display name of a method.
    pub(crate) fn set_method_name(&mut self, method: Token, name: &str) {
        if let Some(info) = self.methods.get_mut(&method) {
            info.name = name.to_string();
        }
    }

    /// Records the shape of a method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks.
    pub fn set_shape(&mut self, shape: MethodShape) -> Result<()> {
        let info = self
            .methods
            .get_mut(&shape.method)
            .ok_or(Error::UnknownMethod(shape.method))?;
        info.shape = Some(shape);
        Ok(())
    }

    /// The recorded shape of `method`.
    #[must_use]
    pub fn shape(&self, method: Token) -> Option<&MethodShape> {
        self.methods.get(&method).and_then(|info| info.shape.as_ref())
    }

    /// The display name of `method`.
    #[must_use]
    pub fn method_name(&self, method: Token) -> Option<&str> {
        self.methods.get(&method).map(|info| info.name.as_str())
    }

    /// Methods in the order they were added.
    #[must_use]
    pub fn methods(&self) -> &[Token] {
        &self.method_order
    }

    pub(crate) fn block_mut(&mut self, block: BlockId) -> Result<&mut BasicBlock> {
        self.graph.node_mut(block).ok_or(Error::UnknownBlock(block))
    }

    /// Looks up a block.
    #[must_use]
    pub fn block(&self, block: BlockId) -> Option<&BasicBlock> {
        self.graph.node(block)
    }

    /// Looks up a block, failing for unknown ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`].
    pub fn get(&self, block: BlockId) -> Result<&BasicBlock> {
        self.graph.node(block).ok_or(Error::UnknownBlock(block))
    }

    /// Number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all blocks in creation order.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> + '_ {
        self.graph.nodes().map(|(_, block)| block)
    }

    /// Iterates over all edges as `(source, target, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (BlockId, BlockId, &CfgEdge)> + '_ {
        self.graph.edges().filter_map(|(id, edge)| {
            self.graph
                .edge_endpoints(id)
                .map(|(from, to)| (from, to, edge))
        })
    }

    /// Adds an edge, classifying it as interprocedural when the endpoints belong
    /// to different methods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if either endpoint does not exist.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) -> Result<EdgeId> {
        let interprocedural = self.get(from)?.method != self.get(to)?.method;
        let id = self.graph.add_edge(from, to, CfgEdge::new(kind, interprocedural))?;
        if self.trace.contains(TraceFlags::CFG_CONSTRUCTION) {
            debug!("edge {} -> {} ({})", from, to, kind);
        }
        Ok(id)
    }

    /// Successors of `block`, in edge insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn successors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.successors(block)
    }

    /// Predecessors of `block`, in edge insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.graph.predecessors(block)
    }

    /// Incoming edges of `block` as `(source, edge)`, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn predecessor_edges(&self, block: BlockId) -> impl Iterator<Item = (BlockId, &CfgEdge)> + '_ {
        self.graph.incoming_edges(block).filter_map(|(id, edge)| {
            self.graph.edge_endpoints(id).map(|(from, _)| (from, edge))
        })
    }

    /// Outgoing edges of `block` as `(target, edge)`, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `block` does not exist.
    pub fn successor_edges(&self, block: BlockId) -> impl Iterator<Item = (BlockId, &CfgEdge)> + '_ {
        self.graph.outgoing_edges(block).filter_map(|(id, edge)| {
            self.graph.edge_endpoints(id).map(|(_, to)| (to, edge))
        })
    }

    /// Entry blocks of all methods, in method order.
    pub fn entries(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.method_order
            .iter()
            .filter_map(|method| self.methods.get(method).map(|info| info.entry))
    }

    /// Entry block of `method`.
    #[must_use]
    pub fn find_entry(&self, method: Token) -> Option<BlockId> {
        self.methods.get(&method).map(|info| info.entry)
    }

    /// The block of `method` holding the instruction at `offset`.
    #[must_use]
    pub fn find_block_at(&self, method: Token, offset: u64) -> Option<BlockId> {
        let layout = self.ordered_blocks(method).ok()?;
        layout.iter().copied().find(|&id| {
            self.graph
                .node(id)
                .is_some_and(|block| block.contains_offset(offset))
        })
    }

    /// True if `block` is its method's entry.
    #[must_use]
    pub fn is_entry(&self, block: BlockId) -> bool {
        self.graph.node(block).is_some_and(BasicBlock::is_entry)
    }

    /// The ordered block list of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks.
    pub fn ordered_blocks(&self, method: Token) -> Result<&[BlockId]> {
        let entry = self.find_entry(method).ok_or(Error::UnknownMethod(method))?;
        self.get(entry)?
            .ordered_blocks()
            .ok_or(Error::UnknownMethod(method))
    }

    /// The last block in `method`'s ordered list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks.
    pub fn exit(&self, method: Token) -> Result<BlockId> {
        self.ordered_blocks(method)?
            .last()
            .copied()
            .ok_or(Error::UnknownMethod(method))
    }

    /// Splits `block` before instruction `index`.
    ///
    /// Instructions `[index, len)` move to a new block of the same method that
    /// is inserted right after `block` in the ordered list. Every outgoing edge
    /// of `block` moves to the new block. A fallthrough edge `block -> new` is
    /// then added iff the instruction now ending `block` falls through.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySplit`] if `index == 0` or `index >= len`
    /// - [`Error::UnknownBlock`] if `block` does not exist
    pub fn split(&mut self, block: BlockId, index: usize) -> Result<BlockId> {
        let original = self.get(block)?;
        let len = original.len();
        if index == 0 || index >= len {
            return Err(Error::EmptySplit { block, index, len });
        }
        let method = original.method;
        let offset = original.instructions[index].offset;
        if self.names.contains_key(&(method, offset)) {
            return Err(malformed_error!(
                "Block for {} at IL_{:04x} already exists",
                method,
                offset
            ));
        }

        let new = self.create_block(method, offset, Some(block));

        let mut moved = self.block_mut(block)?.instructions.split_off(index);
        for instruction in &mut moved {
            instruction.block = Some(new);
        }
        self.block_mut(new)?.instructions = moved;

        let outgoing: Vec<EdgeId> = self.graph.outgoing_edges(block).map(|(id, _)| id).collect();
        for id in outgoing {
            if let Some((_, target)) = self.graph.edge_endpoints(id) {
                if let Some(edge) = self.graph.remove_edge(id) {
                    self.graph.add_edge(new, target, edge)?;
                }
            }
        }

        let falls_through = self
            .get(block)?
            .last()
            .is_some_and(|i| i.flow.implicit_edge() == ImplicitEdge::Fallthrough);
        if falls_through {
            self.add_edge(block, new, EdgeKind::Fallthrough)?;
        }

        if self.trace.contains(TraceFlags::CFG_CONSTRUCTION) {
            debug!(
                "split {} at {} -> {} ({} + {} instructions)",
                block,
                index,
                new,
                index,
                len - index
            );
        }
        Ok(new)
    }

    /// Callee entry blocks reached from `method`'s blocks.
    ///
    /// Walks the ordered block list and yields, for each block, every successor
    /// that is the entry of a different method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks.
    pub fn interprocedural_calls(&self, method: Token) -> Result<Vec<BlockId>> {
        let mut callees = Vec::new();
        for &block in self.ordered_blocks(method)? {
            for next in self.successors(block) {
                let Some(target) = self.block(next) else {
                    continue;
                };
                if target.is_entry() && target.method != method {
                    callees.push(next);
                }
            }
        }
        Ok(callees)
    }

    /// Blocks of `method` in reverse postorder over intraprocedural edges.
    ///
    /// Blocks unreachable from the entry are not included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks.
    pub fn reverse_postorder(&self, method: Token) -> Result<Vec<BlockId>> {
        let entry = self.find_entry(method).ok_or(Error::UnknownMethod(method))?;
        Ok(reverse_postorder(&Intraprocedural { cfg: self }, entry))
    }

    /// Checks structural consistency of every method.
    ///
    /// # Errors
    ///
    /// The first fault [`validate_method`](Self::validate_method) finds, in
    /// method insertion order.
    pub fn validate(&self) -> Result<()> {
        for &method in &self.method_order {
            self.validate_method(method)?;
        }
        Ok(())
    }

    /// Checks structural consistency of one method, ignoring the rest of the
    /// graph.
    ///
    /// - every block holds at least one instruction
    /// - every instruction's owning block is the block holding it
    /// - the ordered list starts at the entry and lists each block of the method once
    /// - every block is reachable from its entry over intraprocedural edges
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMethod`] if the method has no blocks,
    /// [`Error::Malformed`] for the first inconsistency and
    /// [`Error::DeadBlock`] for an unreachable block.
    pub fn validate_method(&self, method: Token) -> Result<()> {
        let layout = self.ordered_blocks(method)?;
        let entry = self.find_entry(method).ok_or(Error::UnknownMethod(method))?;
        if layout.first() != Some(&entry) {
            return Err(malformed_error!("Ordered list of {} does not start at its entry", method));
        }

        let mut listed = vec![false; self.block_count()];
        for &id in layout {
            let block = self.get(id)?;
            if block.method != method || block.entry != entry || listed[id.index()] {
                return Err(malformed_error!("Block {} misplaced in ordered list of {}", id, method));
            }
            listed[id.index()] = true;
        }

        for block in self.blocks().filter(|b| b.method == method) {
            if !listed[block.id.index()] {
                return Err(malformed_error!("Block {} missing from ordered list of {}", block.id, method));
            }
            if block.is_empty() {
                return Err(malformed_error!("Block {} has no instructions", block.id));
            }
            if let Some(stray) = block.instructions.iter().find(|i| i.block != Some(block.id)) {
                return Err(malformed_error!(
                    "Instruction at IL_{:04x} in {} is owned by {:?}",
                    stray.offset,
                    block.id,
                    stray.block
                ));
            }
        }

        let mut reachable = vec![false; self.block_count()];
        for id in dfs(&Intraprocedural { cfg: self }, entry) {
            reachable[id.index()] = true;
        }
        if let Some(&dead) = layout.iter().find(|id| !reachable[id.index()]) {
            return Err(Error::DeadBlock(dead));
        }
        Ok(())
    }
}

/// View of the graph that follows only edges staying inside a method.
struct Intraprocedural<'a> {
    cfg: &'a ControlFlowGraph,
}

impl GraphBase for Intraprocedural<'_> {
    fn node_count(&self) -> usize {
        self.cfg.block_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.cfg.block_count()).map(BlockId::new)
    }
}

impl Successors for Intraprocedural<'_> {
    fn successors(&self, node: BlockId) -> impl Iterator<Item = BlockId> {
        self.cfg
            .successor_edges(node)
            .filter(|(_, edge)| !edge.is_interprocedural())
            .map(|(to, _)| to)
    }
}
