//! Criterion benchmarks for dataset building and walk-forward evaluation.
//!
//! Run with: `cargo bench -p tickcast-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tickcast_core::synthetic::generate_history;
use tickcast_runner::{evaluate, Dataset, Task};

fn bench_dataset_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("dataset_build");

    for rows in [100, 1_000, 10_000].iter() {
        let history = generate_history(*rows, 1);
        group.bench_with_input(BenchmarkId::from_parameter(rows), rows, |b, _| {
            b.iter(|| {
                let _ = Dataset::build(black_box(&history), Task::Regression);
            });
        });
    }

    group.finish();
}

/// Five folds, one fresh pipeline per fold.
fn bench_walk_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk_forward");
    group.sample_size(20);

    for task in Task::ALL {
        for rows in [200, 2_000].iter() {
            let ds = match Dataset::build(&generate_history(*rows, 2), task) {
                Ok(ds) => ds,
                Err(e) => panic!("synthetic dataset: {e}"),
            };
            group.bench_with_input(
                BenchmarkId::new(task.as_str(), rows),
                &ds,
                |b, ds| {
                    b.iter(|| {
                        let _ = evaluate(black_box(ds), 5);
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_dataset_build, bench_walk_forward);
criterion_main!(benches);
