//! Benchmarks for decision-diagram simulation
//!
//! Run with: cargo bench -p quiver-sim

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use quiver_sim::{H_MATRIX, QasmSimulator, SimConfig, Simulator, X_MATRIX};

fn ghz_source(n: usize) -> String {
    let mut source = format!("OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[{n}];\nh q[0];\n");
    for i in 1..n {
        source.push_str(&format!("cx q[{}],q[{i}];\n", i - 1));
    }
    source
}

/// GHZ preparation straight on the engine.
fn bench_ghz_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_engine");

    for n in &[8usize, 32, 128] {
        group.bench_with_input(BenchmarkId::new("prepare", n), n, |b, &n| {
            b.iter(|| {
                let mut sim = Simulator::seeded(0);
                sim.add_variables(n, "q");
                sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
                for q in 1..n {
                    sim.apply_matrix(&X_MATRIX, &[q - 1], q).unwrap();
                }
                black_box(sim.active_nodes())
            });
        });
    }

    group.finish();
}

/// Compile plus sampling through the QASM front end.
fn bench_qasm_shots(c: &mut Criterion) {
    let mut group = c.benchmark_group("qasm_shots");
    let source = ghz_source(16);

    for shots in &[1u32, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("ghz16", shots), shots, |b, &shots| {
            b.iter(|| {
                let config = SimConfig {
                    seed: Some(1),
                    ..SimConfig::default()
                };
                let mut sim = QasmSimulator::from_source("ghz.qasm", &source, config).unwrap();
                black_box(sim.simulate(shots).unwrap())
            });
        });
    }

    group.finish();
}

/// Per-qubit measurement with collapse.
fn bench_measure_one(c: &mut Criterion) {
    c.bench_function("measure_one_ghz32", |b| {
        b.iter(|| {
            let mut sim = Simulator::seeded(3);
            sim.add_variables(32, "q");
            sim.apply_matrix(&H_MATRIX, &[], 0).unwrap();
            for q in 1..32 {
                sim.apply_matrix(&X_MATRIX, &[q - 1], q).unwrap();
            }
            for q in 0..32 {
                black_box(sim.measure_one(q).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_ghz_engine, bench_qasm_shots, bench_measure_one);
criterion_main!(benches);
