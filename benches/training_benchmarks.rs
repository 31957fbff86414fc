//! Training benchmarks
//!
//! - Metric evaluation throughput
//! - Per-candidate fit time
//! - Artifact encoding (LZ4 vs Zstd)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use housing_ml::artifact::{Compression, ModelArtifact};
use housing_ml::dataset::{get_data, HousingSource};
use housing_ml::metrics::eval_regression;
use housing_ml::models::{get_models, Estimator};

/// Benchmark RMSE/MAE/R² over growing prediction vectors
#[allow(clippy::cast_precision_loss)]
fn bench_eval_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("eval_regression");

    for size in [1_000, 10_000, 100_000] {
        let y_true: Vec<f64> = (0..size).map(|i| (i % 97) as f64 * 0.05).collect();
        let y_pred: Vec<f64> = y_true.iter().map(|y| y + 0.1).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| eval_regression(black_box(&y_true), black_box(&y_pred)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark fitting each default candidate
fn bench_candidate_fit(c: &mut Criterion) {
    let split = get_data(&HousingSource::synthetic(500), 0.2, 42).unwrap();
    let mut group = c.benchmark_group("candidate_fit");
    group.sample_size(10);

    for candidate in get_models(42) {
        let (name, model) = candidate.into_parts();
        group.bench_function(BenchmarkId::from_parameter(&name), |b| {
            b.iter(|| {
                let mut model = model.clone();
                model.fit(split.x_train(), split.y_train()).unwrap();
                black_box(model)
            });
        });
    }

    group.finish();
}

/// Benchmark artifact encoding with each compression
fn bench_artifact_encode(c: &mut Criterion) {
    let split = get_data(&HousingSource::synthetic(2_000), 0.2, 42).unwrap();
    let (name, mut model) = get_models(42)
        .into_iter()
        .nth(2)
        .unwrap()
        .into_parts();
    model.fit(split.x_train(), split.y_train()).unwrap();
    let artifact = ModelArtifact::new(name, split.feature_names().to_vec(), model);

    let mut group = c.benchmark_group("artifact_encode");
    for compression in [Compression::Lz4, Compression::Zstd] {
        group.bench_function(BenchmarkId::from_parameter(compression.as_str()), |b| {
            b.iter(|| artifact.encode(black_box(compression)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_eval_regression,
    bench_candidate_fit,
    bench_artifact_encode
);
criterion_main!(benches);
