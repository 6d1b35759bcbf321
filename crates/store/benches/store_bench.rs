use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use store::EmbeddingStore;

fn synthetic(n: usize, dim: usize) -> Array2<f32> {
    Array2::from_shape_fn((n, dim), |(i, j)| ((i * 31 + j * 7) % 97) as f32 / 97.0 - 0.5)
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    group.sample_size(10);

    for n in [100usize, 500, 1000] {
        let matrix = synthetic(n, 768);
        let extra = synthetic(1, 768);

        group.bench_with_input(BenchmarkId::new("add_recompute", n), &n, |b, _| {
            b.iter_batched(
                || EmbeddingStore::from_matrix(matrix.clone()).expect("store"),
                |mut store| {
                    store.add(black_box(extra.row(0))).expect("add");
                    store
                },
                criterion::BatchSize::LargeInput,
            )
        });

        let store = EmbeddingStore::from_matrix(matrix.clone()).expect("store");
        group.bench_with_input(BenchmarkId::new("nearest_neighbors", n), &n, |b, _| {
            b.iter(|| store.nearest_neighbors(black_box(0), 10).expect("neighbors"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_store);
criterion_main!(benches);
