//! Benchmarks for block partitioning and state resolution.
//!
//! - Partitioning a long chain of diamonds
//! - Resolving and lowering the same chain, phis included
//! - Compiling a batch of methods on the rayon pool

extern crate cilflow;

use cilflow::{
    assembly::InstructionAssembler,
    cfg::{CfgBuilder, ControlFlowGraph},
    compiler::{compile_methods, MethodCompiler},
    config::CompilerOptions,
    metadata::{
        signature::{MethodSignature, SourceType},
        token::Token,
        MethodBody,
    },
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// `diamonds` back-to-back if/else blocks, each merging one pushed value into a local.
fn diamond_chain(row: u32, diamonds: usize) -> MethodBody {
    let mut code = InstructionAssembler::new();
    for i in 0..diamonds {
        let other = format!("else{i}");
        let join = format!("join{i}");
        code = code
            .ldarg(0)
            .brfalse(&other)
            .ldloc(0)
            .ldc_i4(1)
            .add()
            .br(&join)
            .label(&other)
            .ldloc(0)
            .ldc_i4(2)
            .sub()
            .label(&join)
            .stloc(0);
    }
    let code = code.ldloc(0).ret_value().finish().unwrap();
    MethodBody::new(
        Token::method(row),
        format!("Chain{row}"),
        MethodSignature::new_static(vec![SourceType::Bool], SourceType::I32),
        vec![SourceType::I32],
        code,
    )
}

fn bench_partition(c: &mut Criterion) {
    let body = diamond_chain(1, 200);
    c.bench_function("partition_200_diamonds", |b| {
        b.iter(|| {
            let mut cfg = ControlFlowGraph::new();
            CfgBuilder::new(&mut cfg, CompilerOptions::default())
                .add_method(black_box(&body))
                .unwrap();
            black_box(cfg)
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let body = diamond_chain(1, 200);
    c.bench_function("resolve_200_diamonds", |b| {
        b.iter(|| {
            let compiled = MethodCompiler::new(CompilerOptions::default())
                .compile(black_box(&body))
                .unwrap();
            black_box(compiled.phi_count())
        });
    });
}

fn bench_parallel(c: &mut Criterion) {
    let bodies: Vec<MethodBody> = (1..=64).map(|row| diamond_chain(row, 50)).collect();
    c.bench_function("compile_64_methods", |b| {
        b.iter(|| black_box(compile_methods(black_box(&bodies), CompilerOptions::default())));
    });
}

criterion_group!(benches, bench_partition, bench_resolve, bench_parallel);
criterion_main!(benches);
