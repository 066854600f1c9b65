//! Control flow graph integration tests: splitting, change sets, call edges
//! and dumps, through the public API only.

use cilflow::{
    assembly::{FlowControl, Instruction, InstructionAssembler},
    cfg::{BlockId, CfgBuilder, ControlFlowGraph, EdgeKind},
    compiler::discover_callees,
    config::CompilerOptions,
    metadata::{signature::MethodSignature, token::Token, MethodBody},
    Error, Result,
};

const METHOD: Token = Token::method(1);

/// A single block holding `code`, created the way the builder seeds a method.
fn single_block(code: InstructionAssembler) -> Result<(ControlFlowGraph, BlockId)> {
    let body = MethodBody::new(METHOD, "Seed", MethodSignature::default(), Vec::new(), code.finish()?);
    let mut cfg = ControlFlowGraph::new();
    // A body without leaders stays one block.
    let entry = CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
    Ok((cfg, entry))
}

fn straight(n: usize) -> InstructionAssembler {
    (0..n - 1)
        .fold(InstructionAssembler::new(), |asm, _| asm.nop())
        .ret()
}

#[test]
fn test_split_sizes_and_bounds() -> Result<()> {
    for n in 2..6 {
        for i in 1..n {
            let (mut cfg, block) = single_block(straight(n))?;
            let new = cfg.split(block, i)?;
            assert_eq!(cfg.get(block)?.len(), i);
            assert_eq!(cfg.get(new)?.len(), n - i);
            assert!(cfg
                .get(new)?
                .instructions()
                .iter()
                .all(|ins: &Instruction| ins.block() == Some(new)));
            assert_eq!(cfg.ordered_blocks(METHOD)?, &[block, new]);
        }

        let (mut cfg, block) = single_block(straight(n))?;
        assert!(matches!(cfg.split(block, 0), Err(Error::EmptySplit { .. })));
        assert!(matches!(cfg.split(block, n), Err(Error::EmptySplit { .. })));
        assert_eq!(cfg.get(block)?.len(), n);
    }
    Ok(())
}

#[test]
fn test_split_moves_edges_and_adds_fallthrough() -> Result<()> {
    let (mut cfg, block) = single_block(straight(3))?;
    let other = cfg.add_vertex(METHOD, 0x100);
    cfg.add_edge(block, other, EdgeKind::Branch)?;

    let new = cfg.split(block, 2)?;
    let from_original: Vec<_> = cfg.successor_edges(block).map(|(t, e)| (t, e.kind())).collect();
    assert_eq!(from_original, vec![(new, EdgeKind::Fallthrough)]);
    let from_new: Vec<_> = cfg.successors(new).collect();
    assert_eq!(from_new, vec![other]);
    assert_eq!(cfg.predecessors(other).collect::<Vec<_>>(), vec![new]);
    Ok(())
}

#[test]
fn test_fallthrough_follows_flow_control() -> Result<()> {
    for (code, falls) in [
        (InstructionAssembler::new().break_().ret(), false),
        (InstructionAssembler::new().call(Token::method(5), 0, 0).ret(), false),
        (InstructionAssembler::new().ldc_i4(1).ret(), true),
    ] {
        let (mut cfg, block) = single_block(code)?;
        let first = cfg.get(block)?.instructions()[0].flow;
        let new = cfg.split(block, 1)?;
        assert_eq!(cfg.successors(block).any(|s| s == new), falls, "{first}");
        if first == FlowControl::Call {
            assert!(cfg.get(block)?.is_call());
        }
    }
    Ok(())
}

#[test]
fn test_nested_change_sets() -> Result<()> {
    let mut cfg = ControlFlowGraph::new();
    let outer = cfg.start_change_set();
    let a = cfg.add_vertex(METHOD, 0);
    let inner = cfg.start_change_set();
    let b = cfg.add_vertex(METHOD, 4);
    assert_eq!(cfg.add_vertex(METHOD, 4), b);
    let c = cfg.add_vertex(Token::method(2), 0);

    assert_eq!(cfg.pop_change_set(inner)?, vec![b, c]);
    let d = cfg.add_vertex(METHOD, 8);
    assert_eq!(cfg.pop_change_set(outer)?, vec![a, b, c, d]);
    assert!(matches!(
        cfg.pop_change_set(outer),
        Err(Error::UnknownChangeSet(_))
    ));
    assert_ne!(outer, inner);
    Ok(())
}

#[test]
fn test_split_records_in_change_set() -> Result<()> {
    let (mut cfg, block) = single_block(straight(4))?;
    let changes = cfg.start_change_set();
    let second = cfg.split(block, 1)?;
    let third = cfg.split(second, 2)?;
    assert_eq!(cfg.pop_change_set(changes)?, vec![second, third]);
    assert_eq!(cfg.exit(METHOD)?, third);
    Ok(())
}

#[test]
fn test_interprocedural_calls_and_dumps() -> Result<()> {
    let callee = MethodBody::new(
        Token::method(2),
        "Helper",
        MethodSignature::default(),
        Vec::new(),
        InstructionAssembler::new().ret().finish()?,
    );
    let caller = MethodBody::new(
        METHOD,
        "Main",
        MethodSignature::default(),
        Vec::new(),
        InstructionAssembler::new()
            .call(Token::method(2), 0, 0)
            .call(Token::method(3), 0, 0)
            .ret()
            .finish()?,
    );
    let bodies = [caller, callee];

    let mut cfg = ControlFlowGraph::new();
    let found = discover_callees(&mut cfg, METHOD, CompilerOptions::call_graph(), |t| {
        bodies.iter().find(|b| b.token == t)
    })?;
    assert_eq!(found.methods, vec![METHOD, Token::method(2)]);
    assert_eq!(found.external, vec![Token::method(3)]);

    let helper = cfg.find_entry(Token::method(2)).unwrap();
    assert_eq!(cfg.interprocedural_calls(METHOD)?, vec![helper]);
    assert!(cfg.interprocedural_calls(Token::method(2))?.is_empty());
    assert!(cfg
        .predecessor_edges(helper)
        .all(|(_, edge)| edge.is_interprocedural()));
    assert_eq!(cfg.entries().count(), 2);
    cfg.validate()?;

    let text = cfg.to_text();
    assert!(text.contains("Method Main"));
    assert!(text.contains("Method Helper"));
    let dot = cfg.to_dot();
    assert!(dot.contains(&format!("  {} -> {};", cfg.find_entry(METHOD).unwrap(), helper)));
    Ok(())
}

#[test]
fn test_validate_rejects_empty_blocks() -> Result<()> {
    let (mut cfg, _) = single_block(straight(2))?;
    let orphan = cfg.add_vertex(METHOD, 0x40);
    // An empty block fails before reachability is checked.
    assert!(cfg.validate().is_err());
    assert!(cfg.get(orphan)?.is_empty());
    Ok(())
}
