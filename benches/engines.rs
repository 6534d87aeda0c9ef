//! Benchmarks comparing the concurrency strategies on one generation load.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use knapsack_ga::{
    engine,
    schema::{GaConfig, ItemCatalog, Strategy},
};

fn bench_config(population_size: usize) -> GaConfig {
    GaConfig {
        generations: 3,
        population_size,
        prob_mutation: 0.5,
        tournament_size: 3,
        seed: 42,
        silent: true,
    }
}

fn strategies() -> Vec<Strategy> {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    vec![
        Strategy::Sequential,
        Strategy::ForkJoin { threshold: 1000 },
        Strategy::Streams,
        Strategy::ScatterGather {
            num_threads: workers,
            chunk_size: 1000,
        },
        Strategy::MasterWorker {
            num_workers: workers,
            chunk_size: 1000,
        },
        Strategy::Channel {
            num_workers: workers,
            chunk_size: 1000,
        },
        Strategy::Actor {
            num_workers: workers,
            chunk_size: 1000,
        },
        Strategy::Tasks {
            num_workers: workers,
            chunk_size: 1000,
        },
    ]
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.sample_size(10);

    let catalog = Arc::new(ItemCatalog::random(1000, 300, 1));
    let config = bench_config(10_000);

    for strategy in strategies() {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy.name()),
            &strategy,
            |b, strategy| {
                b.iter(|| {
                    let mut solver =
                        engine::build(strategy, Arc::clone(&catalog), config.clone()).unwrap();
                    black_box(solver.run());
                });
            },
        );
    }

    group.finish();
}

fn bench_population_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_scaling");
    group.sample_size(10);

    let catalog = Arc::new(ItemCatalog::random(1000, 300, 1));

    for population_size in [1_000, 10_000, 50_000] {
        let config = bench_config(population_size);

        group.bench_with_input(
            BenchmarkId::from_parameter(population_size),
            &population_size,
            |b, _| {
                b.iter(|| {
                    let mut solver = engine::build(
                        &Strategy::Streams,
                        Arc::clone(&catalog),
                        config.clone(),
                    )
                    .unwrap();
                    black_box(solver.run());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_population_scaling);
criterion_main!(benches);
