//! Benchmarks for the forest and the PU ensemble.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use epiml::prelude::*;

fn blobs(n: usize) -> (Matrix<f32>, Vec<i32>) {
    let mut data = Vec::with_capacity(n * 4);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let f = (i % 17) as f32 * 0.05;
        match i % 4 {
            0 => {
                data.extend_from_slice(&[3.0 + f, 2.5 - f, 1.0, f]);
                y.push(1);
            }
            1 => {
                data.extend_from_slice(&[f, 0.5 + f, 0.0, f]);
                y.push(0);
            }
            _ => {
                data.extend_from_slice(&[f * 2.0, f, 0.0, 1.0 - f]);
                y.push(-1);
            }
        }
    }
    (Matrix::from_vec(n, 4, data).unwrap(), y)
}

fn bench_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_forest_fit");

    for size in [100, 500, 2000].iter() {
        let (x, y) = blobs(*size);
        let labeled: Vec<usize> = y.iter().map(|&l| usize::from(l == 1)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut forest = RandomForestClassifier::new(20).with_random_state(0);
                forest.fit(black_box(&x), black_box(&labeled)).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_pu_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("pnu_subsampler_fit");
    group.sample_size(10);

    for size in [200, 1000].iter() {
        let (x, y) = blobs(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let forest = RandomForestClassifier::new(10);
                let mut model =
                    PNUWrapper::new(RepeatedRandomSubSampler::new(forest).with_random_state(1))
                        .with_random_state(1);
                model.fit_pu(black_box(&x), black_box(&y)).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_pu_predict(c: &mut Criterion) {
    let (x, y) = blobs(1000);
    let forest = RandomForestClassifier::new(10);
    let mut model =
        PNUWrapper::new(RepeatedRandomSubSampler::new(forest).with_random_state(2)).with_random_state(2);
    model.fit_pu(&x, &y).unwrap();

    c.bench_function("pnu_subsampler_predict_proba", |b| {
        b.iter(|| model.predict_positive_proba(black_box(&x)).unwrap());
    });
}

criterion_group!(benches, bench_forest_fit, bench_pu_fit, bench_pu_predict);
criterion_main!(benches);
