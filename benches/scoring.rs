//! Scoring benchmarks: the four bitset strategies against naive traversal.
//!
//! # Running benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! HTML reports are generated in `target/criterion/`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rapidscorer::testing::{documents_matrix, random_documents, random_forest, reference_score};
use rapidscorer::{
    score_all, Config, EqNodesScorer, LinearizedScorer, MergedScorer, Scorer, Simd256x32,
    SimdScorer,
};

const N_TREES: usize = 500;
const MAX_DEPTH: u32 = 6;
const N_FEATURES: usize = 64;
const N_DOCS: usize = 1000;

fn bench_strategies(c: &mut Criterion) {
    let forest = random_forest(N_TREES, MAX_DEPTH, N_FEATURES as u32, 42);
    let documents = random_documents(N_DOCS, N_FEATURES, 43);
    let matrix = documents_matrix(&documents);

    let mut group = c.benchmark_group("score_batch");
    group.throughput(Throughput::Elements(N_DOCS as u64));

    group.bench_function(BenchmarkId::new("traversal", N_DOCS), |b| {
        b.iter(|| {
            let total: f64 = documents
                .iter()
                .map(|doc| reference_score(black_box(&forest), doc))
                .sum();
            black_box(total)
        })
    });

    let merged = MergedScorer::<u32>::new(Config::serial(), &forest).unwrap();
    group.bench_function(BenchmarkId::new("merged_u32", N_DOCS), |b| {
        b.iter(|| black_box(score_all(&merged, matrix.view()).unwrap()))
    });

    let linearized = LinearizedScorer::<u32>::new(Config::serial(), &forest).unwrap();
    group.bench_function(BenchmarkId::new("linearized_u32", N_DOCS), |b| {
        b.iter(|| black_box(score_all(&linearized, matrix.view()).unwrap()))
    });

    let eqnodes = EqNodesScorer::<u32>::new(Config::serial(), &forest).unwrap();
    group.bench_function(BenchmarkId::new("eqnodes_u32", N_DOCS), |b| {
        b.iter(|| black_box(score_all(&eqnodes, matrix.view()).unwrap()))
    });

    let simd = SimdScorer::<Simd256x32>::new(Config::serial(), &forest).unwrap();
    group.bench_function(BenchmarkId::new("simd256x32", N_DOCS), |b| {
        b.iter(|| black_box(score_all(&simd, matrix.view()).unwrap()))
    });

    group.finish();
}

fn bench_parallel_documents(c: &mut Criterion) {
    let forest = random_forest(N_TREES, MAX_DEPTH, N_FEATURES as u32, 42);
    let documents = random_documents(N_DOCS, N_FEATURES, 43);
    let matrix = documents_matrix(&documents);

    let mut group = c.benchmark_group("parallel_documents");
    group.throughput(Throughput::Elements(N_DOCS as u64));

    for threads in [1usize, 2, 4, 8] {
        let config = if threads == 1 {
            Config::serial()
        } else {
            Config::parallel_documents(threads)
        };
        let scorer = MergedScorer::<u32>::new(config, &forest).unwrap();
        group.bench_with_input(
            BenchmarkId::new("merged_u32", threads),
            &threads,
            |b, _| b.iter(|| black_box(score_all(&scorer, matrix.view()).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_parallel_documents);
criterion_main!(benches);
