//! Benchmarks for the pulse-efficient pipeline
//!
//! Run with: cargo bench -p crisp-compile

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use crisp_compile::unitary::{standard_gate_matrix, to_matrix4};
use crisp_compile::{BasisGates, EchoMode, Pipeline, PipelineConfig, weyl};
use crisp_ir::{Circuit, StandardGate};
use crisp_pulse::InstructionMap;

fn linear_config(n: u32) -> PipelineConfig {
    let pairs: Vec<(u32, u32)> = (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
    PipelineConfig::new(
        BasisGates::ibm_cr(),
        Arc::new(InstructionMap::synthetic(n, &pairs)),
    )
    .with_verification(false)
}

/// Benchmark the full pipeline on GHZ and QFT circuits
fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for n in [2u32, 5, 10, 20] {
        let pipeline = Pipeline::pulse_efficient(linear_config(n));
        let dag = Circuit::ghz(n).unwrap().into_dag();
        group.bench_with_input(BenchmarkId::new("ghz", n), &dag, |b, dag| {
            b.iter(|| pipeline.run(black_box(dag.clone())).unwrap());
        });
    }

    for n in [2u32, 3, 4] {
        let pairs: Vec<(u32, u32)> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect();
        let config = PipelineConfig::new(
            BasisGates::ibm_cr(),
            Arc::new(InstructionMap::synthetic(n, &pairs)),
        )
        .with_echo_mode(EchoMode::Pulse);
        let pipeline = Pipeline::pulse_efficient(config);
        let dag = Circuit::qft(n).unwrap().into_dag();
        group.bench_with_input(BenchmarkId::new("qft", n), &dag, |b, dag| {
            b.iter(|| pipeline.run(black_box(dag.clone())).unwrap());
        });
    }

    group.finish();
}

/// Benchmark the Weyl decomposition alone
fn bench_weyl(c: &mut Criterion) {
    let mut group = c.benchmark_group("weyl");

    for (name, gate) in [
        ("cx", StandardGate::CX),
        ("swap", StandardGate::Swap),
        ("iswap", StandardGate::ISwap),
    ] {
        let u = to_matrix4(&standard_gate_matrix(&gate).unwrap()).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| weyl::decompose(black_box(&u)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_weyl);
criterion_main!(benches);
