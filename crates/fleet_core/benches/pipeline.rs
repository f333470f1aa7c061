//! Decision pipeline benchmarks for fleet_core.
//!
//! Run with: `cargo bench -p fleet_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleet_core::prelude::*;
use fleet_test_utils::fixtures::dense_battle;

/// Full per-turn decision on increasingly crowded battles.
pub fn pipeline_benchmark(c: &mut Criterion) {
    let pipeline = DecisionPipeline::default();
    let mut group = c.benchmark_group("decide");
    for per_side in [5u32, 20, 48] {
        let snapshot = dense_battle(per_side);
        group.bench_with_input(BenchmarkId::from_parameter(per_side), &snapshot, |b, s| {
            b.iter(|| pipeline.decide(black_box(s), &TargetLock::empty()));
        });
    }
    group.finish();
}

/// Hazard stamping alone, which dominates when much fire is incoming.
pub fn hazard_benchmark(c: &mut Criterion) {
    let snapshot = dense_battle(48);
    let tactics = TacticsConfig {
        avoid_opponent_predictions: true,
        ..TacticsConfig::default()
    };
    c.bench_function("hazard_map_48", |b| {
        b.iter(|| HazardMap::build(black_box(&snapshot), &tactics));
    });
}

criterion_group!(benches, pipeline_benchmark, hazard_benchmark);
criterion_main!(benches);
