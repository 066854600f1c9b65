//! State resolution integration tests.
//!
//! These tests drive the whole pipeline through the public API:
//! 1. Build CIL with `InstructionAssembler`
//! 2. Partition it into blocks with `CfgBuilder`
//! 3. Resolve entry states in reverse postorder and lower each block
//! 4. Fill phis and check depths, sections and phi operands

use cilflow::{
    assembly::InstructionAssembler,
    cfg::{BlockId, CfgBuilder, ControlFlowGraph, EdgeKind},
    compiler::{BlockLowering, MethodCompiler, StackEffectLowering},
    config::{CompilerOptions, TraceFlags},
    ir::{IrType, Value, ValueTable},
    metadata::{
        signature::{MethodSignature, SourceType},
        token::Token,
        MethodBody,
    },
    state::{Section, StateResolver},
    Error, Result,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn static_body(
    name: &str,
    params: Vec<SourceType>,
    locals: Vec<SourceType>,
    code: InstructionAssembler,
) -> Result<MethodBody> {
    Ok(MethodBody::new(
        Token::method(1),
        name,
        MethodSignature::new_static(params, SourceType::I32),
        locals,
        code.finish()?,
    ))
}

#[test]
fn test_straight_line_one_argument_one_local() -> Result<()> {
    init_logging();
    let body = static_body(
        "Straight",
        vec![SourceType::I32],
        vec![SourceType::I32],
        InstructionAssembler::new().nop().ldarg(0).ret_value(),
    )?;
    let compiled = MethodCompiler::new(CompilerOptions::default().with_trace(TraceFlags::all()))
        .compile(&body)?;

    let entry = compiled.entry_state(compiled.entry()?)?;
    assert_eq!(entry.depth(), 2);
    assert!(entry.this().is_empty());
    assert_eq!(entry.arguments(), Section::new(0, 1));
    assert_eq!(entry.locals(), Section::new(1, 1));
    assert_eq!(entry.stack().get(1), Some(&Value::const_int(IrType::I32, 0)));
    assert_eq!(compiled.phi_count(), 0);
    Ok(())
}

#[test]
fn test_diamond_join_gets_one_phi_per_slot() -> Result<()> {
    init_logging();
    let body = static_body(
        "Diamond",
        vec![SourceType::Bool],
        Vec::new(),
        InstructionAssembler::new()
            .ldarg(0)
            .brfalse("else")
            .ldc_i4(10)
            .br("join")
            .label("else")
            .ldc_i4(20)
            .label("join")
            .ret_value(),
    )?;
    let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
    let layout = compiled.cfg.ordered_blocks(body.token)?.to_vec();
    let join = layout[3];

    let state = compiled.entry_state(join)?;
    assert_eq!(state.depth(), 2);
    assert_eq!(state.phis().len(), 2);
    assert_eq!(compiled.phi_count(), 2);
    for (slot, phi) in state.phis().iter().enumerate() {
        assert_eq!(state.stack().get(slot), Some(phi));
        let incoming = compiled.values.phi_incoming(phi).unwrap();
        assert_eq!(incoming.len(), 2);
    }

    // The pushed constants arrive from their own branch.
    let pushed = compiled.values.phi_incoming(&state.phis()[1]).unwrap();
    assert!(pushed.contains(&(Value::const_int(IrType::I32, 10), layout[1])));
    assert!(pushed.contains(&(Value::const_int(IrType::I32, 20), layout[2])));
    Ok(())
}

#[test]
fn test_diamond_over_arguments_only() -> Result<()> {
    init_logging();
    // if (a0) a1 = 1 else a1 = 2; return a1
    let body = static_body(
        "Assign",
        vec![SourceType::Bool, SourceType::I32],
        Vec::new(),
        InstructionAssembler::new()
            .ldarg(0)
            .brfalse("else")
            .ldc_i4(1)
            .starg(1)
            .br("join")
            .label("else")
            .ldc_i4(2)
            .starg(1)
            .label("join")
            .ldarg(1)
            .ret_value(),
    )?;
    let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
    let layout = compiled.cfg.ordered_blocks(body.token)?.to_vec();
    let join = layout[3];

    let state = compiled.entry_state(join)?;
    assert_eq!(state.depth(), 2);
    assert_eq!(state.arguments(), Section::new(0, 2));
    assert_eq!(state.phis().len(), 2);
    assert_eq!(compiled.phi_count(), 2);
    assert_eq!(state.stack().as_slice(), state.phis());

    let assigned = compiled.values.phi_incoming(&state.phis()[1]).unwrap();
    assert_eq!(assigned.len(), 2);
    assert!(assigned.contains(&(Value::const_int(IrType::I32, 1), layout[1])));
    assert!(assigned.contains(&(Value::const_int(IrType::I32, 2), layout[2])));
    Ok(())
}

#[test]
fn test_select_keeps_operand_types_at_join() -> Result<()> {
    init_logging();
    // a1 ? a0 : a0 + 1, over long
    let long = MethodBody::new(
        Token::method(1),
        "SelectLong",
        MethodSignature::new_static(vec![SourceType::I64, SourceType::Bool], SourceType::I64),
        Vec::new(),
        InstructionAssembler::new()
            .ldarg(1)
            .brtrue("plain")
            .ldarg(0)
            .ldc_i8(1)
            .add()
            .br("join")
            .label("plain")
            .ldarg(0)
            .label("join")
            .ret_value()
            .finish()?,
    );
    // a1 ? a0 : a0 * 2.0, over double
    let double = MethodBody::new(
        Token::method(2),
        "SelectDouble",
        MethodSignature::new_static(vec![SourceType::F64, SourceType::Bool], SourceType::F64),
        Vec::new(),
        InstructionAssembler::new()
            .ldarg(1)
            .brtrue("plain")
            .ldarg(0)
            .ldc_r8(2.0)
            .mul()
            .br("join")
            .label("plain")
            .ldarg(0)
            .label("join")
            .ret_value()
            .finish()?,
    );

    for (body, ty) in [(long, IrType::Int(64)), (double, IrType::F64)] {
        let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
        let join = compiled.cfg.ordered_blocks(body.token)?[3];
        let state = compiled.entry_state(join)?;
        assert_eq!(state.depth(), 3);
        assert_eq!(state.phis().len(), 3);
        assert_eq!(state.phis()[0].ty(), &ty);
        assert_eq!(state.phis()[2].ty(), &ty);
    }
    Ok(())
}

#[test]
fn test_entry_block_as_loop_header() -> Result<()> {
    init_logging();
    // top: l0 = l0 + 1; goto top
    let body = static_body(
        "Count",
        vec![SourceType::I32],
        vec![SourceType::I32],
        InstructionAssembler::new()
            .label("top")
            .ldloc(0)
            .ldc_i4(1)
            .add()
            .stloc(0)
            .br("top"),
    )?;
    let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
    let entry = compiled.entry()?;
    assert_eq!(compiled.states.joins, vec![entry]);

    let state = compiled.entry_state(entry)?;
    assert_eq!(state.depth(), 2);
    assert_eq!(state.phis().len(), 2);
    assert_eq!(compiled.phi_count(), 2);

    let [arg, local] = state.phis() else {
        panic!("expected two phis");
    };
    let param = compiled.values.phi_prologue(arg).unwrap();
    assert!(param.as_def().is_some());
    assert!(!compiled.values.is_phi(param));
    assert_eq!(
        compiled.values.phi_prologue(local),
        Some(&Value::const_int(IrType::I32, 0))
    );

    // The back edge carries the argument through and the incremented local.
    let exit = compiled.exit_state(entry)?;
    assert_eq!(
        compiled.values.phi_incoming(arg).unwrap(),
        &[(arg.clone(), entry)]
    );
    assert_eq!(
        compiled.values.phi_incoming(local).unwrap(),
        &[(exit.stack().as_slice()[1].clone(), entry)]
    );
    Ok(())
}

#[test]
fn test_loop_header_fill_keeps_phi_count() -> Result<()> {
    init_logging();
    let body = static_body(
        "Loop",
        vec![SourceType::I32],
        vec![SourceType::I32],
        InstructionAssembler::new()
            .ldc_i4(0)
            .stloc(0)
            .label("head")
            .ldloc(0)
            .ldarg(0)
            .blt("body")
            .ldloc(0)
            .ret_value()
            .label("body")
            .ldloc(0)
            .ldc_i4(1)
            .add()
            .stloc(0)
            .br("head"),
    )?;

    let mut cfg = ControlFlowGraph::new();
    CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
    let order = cfg.reverse_postorder(body.token)?;
    let layout = cfg.ordered_blocks(body.token)?.to_vec();
    let header = layout[1];
    let back = layout[3];

    let mut values = ValueTable::new();
    let mut lowering = StackEffectLowering::new();
    let mut resolver = StateResolver::new(&cfg, body.token, CompilerOptions::default())?;
    for block in order {
        let entry = resolver.resolve(block, &mut values)?.clone();
        if block == header {
            // Only the forward predecessor is known on the first visit.
            assert!(resolver.exit_state(back).is_err());
            assert_eq!(entry.phis().len(), 2);
        }
        let exit = lowering.lower(cfg.get(block)?, &entry)?;
        resolver.record_exit(block, exit)?;
    }

    let before = values.phi_count();
    assert_eq!(resolver.pending_joins(), &[header]);
    assert_eq!(resolver.fill_phis(&mut values)?, 1);
    assert_eq!(values.phi_count(), before);
    assert!(resolver.pending_joins().is_empty());

    let phis = resolver.entry_state(header)?.phis().to_vec();
    for phi in &phis {
        let incoming = values.phi_incoming(phi).unwrap();
        assert_eq!(
            incoming.iter().map(|(_, b)| *b).collect::<Vec<BlockId>>(),
            vec![layout[0], back]
        );
    }
    Ok(())
}

#[test]
fn test_single_predecessor_copies_state() -> Result<()> {
    let body = static_body(
        "Chain",
        vec![SourceType::I32, SourceType::I64],
        vec![SourceType::F64],
        InstructionAssembler::new()
            .ldarg(1)
            .br("next")
            .label("next")
            .pop()
            .ret(),
    )?;
    let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
    let layout = compiled.cfg.ordered_blocks(body.token)?;
    let first_exit = compiled.exit_state(layout[0])?;
    let second_entry = compiled.entry_state(layout[1])?;

    assert_eq!(second_entry.depth(), first_exit.depth());
    assert!(second_entry.same_layout(first_exit));
    assert_eq!(second_entry.stack(), first_exit.stack());
    assert!(second_entry.phis().is_empty());
    assert_eq!(second_entry.depth(), 4);
    Ok(())
}

#[test]
fn test_join_with_unequal_depths_fails() -> Result<()> {
    let mut cfg = ControlFlowGraph::new();
    let body = static_body(
        "Uneven",
        vec![SourceType::Bool],
        Vec::new(),
        InstructionAssembler::new()
            .ldarg(0)
            .brtrue("extra")
            .br("join")
            .label("extra")
            .ldc_i4(1)
            .label("join")
            .ret(),
    )?;
    CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;

    let err = MethodCompiler::new(CompilerOptions::default())
        .resolve_in(&cfg, body.token, &mut ValueTable::new())
        .unwrap_err();
    match err {
        Error::StackSizeMismatch {
            expected, found, ..
        } => assert_ne!(expected, found),
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn test_entry_depth_counts_arguments_and_locals() -> Result<()> {
    let body = MethodBody::new(
        Token::method(7),
        "Vec3::Scale",
        MethodSignature::new_instance(
            SourceType::class("Vec3"),
            vec![SourceType::F32, SourceType::Object],
            SourceType::Void,
        ),
        vec![SourceType::I32, SourceType::String, SourceType::F64],
        InstructionAssembler::new().ret().finish()?,
    );
    let compiled = MethodCompiler::new(CompilerOptions::default()).compile(&body)?;
    let entry = compiled.entry_state(compiled.entry()?)?;

    assert_eq!(entry.depth(), 3 + 3);
    assert_eq!(entry.this(), Section::new(0, 1));
    assert_eq!(entry.arguments(), Section::new(0, 3));
    assert_eq!(entry.locals(), Section::new(3, 3));
    assert_eq!(
        entry.stack().view(entry.locals()),
        &[
            Value::const_int(IrType::I32, 0),
            Value::null(IrType::Pointer),
            Value::const_real(IrType::F64, 0.0),
        ]
    );
    Ok(())
}

#[test]
fn test_interprocedural_edge_into_body_is_rejected() -> Result<()> {
    let body = static_body(
        "Target",
        Vec::new(),
        Vec::new(),
        InstructionAssembler::new()
            .nop()
            .br("tail")
            .label("tail")
            .ret(),
    )?;
    let mut cfg = ControlFlowGraph::new();
    CfgBuilder::new(&mut cfg, CompilerOptions::default()).add_method(&body)?;
    let tail = cfg.ordered_blocks(body.token)?[1];
    let stranger = cfg.add_vertex(Token::method(2), 0);
    cfg.add_edge(stranger, tail, EdgeKind::Branch)?;

    let mut values = ValueTable::new();
    let mut resolver = StateResolver::new(&cfg, body.token, CompilerOptions::default())?;
    let entry = cfg.find_entry(body.token).unwrap();
    let state = resolver.resolve(entry, &mut values)?.fork();
    resolver.record_exit(entry, state)?;
    assert!(matches!(
        resolver.resolve(tail, &mut values),
        Err(Error::InterproceduralEdge { .. })
    ));
    Ok(())
}
