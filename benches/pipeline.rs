use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use chrono::{Duration, NaiveDate};
use loadcast::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

fn create_series(n_rows: usize) -> RawSeries {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();

    (0..n_rows)
        .map(|i| {
            let daily = (2.0 * std::f64::consts::PI * i as f64 / 24.0).sin();
            let covariates = Covariates {
                temperature: 15.0 + 5.0 * daily + rng.gen::<f64>(),
                humidity: 60.0 + rng.gen::<f64>() * 10.0,
                wind_speed: rng.gen::<f64>(),
                general_diffuse_flows: rng.gen::<f64>() * 100.0,
                diffuse_flows: rng.gen::<f64>() * 50.0,
            };
            let base = 30_000.0 + 8_000.0 * daily;
            Observation::new(
                start + Duration::hours(i as i64),
                covariates,
                [base + rng.gen::<f64>() * 500.0, 0.6 * base, 0.3 * base],
            )
        })
        .collect()
}

fn bench_features(c: &mut Criterion) {
    let mut group = c.benchmark_group("features");

    for n_rows in [1_000, 10_000].iter() {
        let series = create_series(*n_rows);
        let builder = FeatureBuilder::default();

        group.bench_with_input(BenchmarkId::new("build", n_rows), &series, |b, series| {
            b.iter(|| builder.build(black_box(series)).unwrap())
        });
    }

    group.finish();
}

fn bench_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("models");
    group.sample_size(10);

    let table = FeatureBuilder::default().build(&create_series(600)).unwrap();
    let scaled = Normalizer::new().fit_transform(&table).unwrap();
    let windows = WindowBuilder::default().build(&scaled).unwrap();

    group.bench_function("ridge_fit", |b| {
        b.iter(|| {
            let mut model = RidgeRegressor::new(RidgeConfig::default());
            model.fit(black_box(&windows)).unwrap()
        })
    });

    group.bench_function("lstm_epoch", |b| {
        let config = LstmConfig::default().with_sizes(16, 8).with_epochs(1);
        b.iter(|| {
            let mut model = LstmRegressor::new(config.clone());
            model.fit(black_box(&windows)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_features, bench_models);
criterion_main!(benches);
