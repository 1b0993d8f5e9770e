//! Criterion benchmarks for spanner search over random `U` matrices.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use las_core::{DeterminantSpanner, OneRankSpanner, Spanner};
use nalgebra::DMatrix;

fn u_matrix(actions: usize, rank: usize) -> DMatrix<f32> {
    DMatrix::from_fn(actions, rank, |i, j| {
        let x = ((i * 31 + j * 17) as u64)
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        ((x % 2_000) as f32 - 1_000.0) / 1_000.0
    })
}

fn bench_one_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("spanner/one_rank");
    for (actions, rank) in [(100usize, 5usize), (1_000, 10), (10_000, 20)] {
        let u = u_matrix(actions, rank);
        let shrink = vec![1.0f32; actions];
        let id = BenchmarkId::from_parameter(format!("{actions}x{rank}"));
        group.bench_with_input(id, &u, |b, u| {
            let mut spanner = OneRankSpanner::new(2.0);
            b.iter(|| {
                spanner.compute_spanner(black_box(u), rank, &shrink);
                black_box(spanner.action_indices().len());
            });
        });
    }
    group.finish();
}

fn bench_determinant(c: &mut Criterion) {
    let mut group = c.benchmark_group("spanner/full_determinant");
    group.sample_size(20);
    for (actions, rank) in [(100usize, 5usize), (500, 8)] {
        let u = u_matrix(actions, rank);
        let shrink = vec![1.0f32; actions];
        let id = BenchmarkId::from_parameter(format!("{actions}x{rank}"));
        group.bench_with_input(id, &u, |b, u| {
            let mut spanner = DeterminantSpanner::new(2.0);
            b.iter(|| {
                spanner.compute_spanner(black_box(u), rank, &shrink);
                black_box(spanner.action_indices().len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_one_rank, bench_determinant);
criterion_main!(benches);
