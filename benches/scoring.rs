use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use loan_risk::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

fn create_loan_batch(n_rows: usize, rng: &mut Xoshiro256PlusPlus) -> TrainingBatch {
    let income_types = ["Working", "Pensioner", "Commercial associate", "State servant"];
    let records = (0..n_rows)
        .map(|_| {
            let income: f64 = rng.gen_range(25_000.0..400_000.0);
            let credit: f64 = rng.gen_range(45_000.0..2_000_000.0);
            let ext: f64 = rng.gen();
            let target = if credit / income > 8.0 || ext < 0.15 { 1.0 } else { 0.0 };
            Record::new()
                .with("CODE_GENDER", if rng.gen_bool(0.35) { "M" } else { "F" })
                .with("FLAG_OWN_CAR", if rng.gen_bool(0.3) { "Y" } else { "N" })
                .with("NAME_INCOME_TYPE", income_types[rng.gen_range(0..income_types.len())])
                .with("AMT_INCOME_TOTAL", income)
                .with("AMT_CREDIT", credit)
                .with("DAYS_BIRTH", -rng.gen_range(7_000.0..25_000.0))
                .with("EXT_SOURCE_2", if rng.gen_bool(0.1) { None } else { Some(ext) })
                .with("TARGET", target)
        })
        .collect();
    TrainingBatch::from_records(records)
}

fn feature_set() -> FeatureSet {
    FeatureSet::new("TARGET")
        .with_feature(FeatureSpec::one_hot("CODE_GENDER"))
        .with_feature(FeatureSpec::binary("FLAG_OWN_CAR"))
        .with_feature(FeatureSpec::one_hot("NAME_INCOME_TYPE"))
        .with_feature(FeatureSpec::numeric("AMT_INCOME_TOTAL"))
        .with_feature(FeatureSpec::numeric("AMT_CREDIT"))
        .with_feature(
            FeatureSpec::numeric("DAYS_BIRTH").with_unit(UnitConvention::NegatedDaysToYears),
        )
        .with_feature(FeatureSpec::numeric("EXT_SOURCE_2"))
}

fn bench_scoring(c: &mut Criterion) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let batch = create_loan_batch(2_000, &mut rng);
    let config = TrainingConfig::new().with_features(feature_set());
    let facade = ScoringFacade::new(Trainer::new(config).fit(&batch).unwrap());
    let record = batch.records()[0].clone();

    c.bench_function("score_single", |b| {
        b.iter(|| facade.score(black_box(&record)).unwrap())
    });

    c.bench_function("encode_single", |b| {
        b.iter(|| facade.encode(black_box(&record)).unwrap())
    });

    let mut group = c.benchmark_group("score_batch");
    for n in [10usize, 100, 1000] {
        let records = batch.records()[..n].to_vec();
        group.bench_with_input(BenchmarkId::from_parameter(n), &records, |b, records| {
            b.iter(|| facade.score_batch(black_box(records)))
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    for n_rows in [1_000usize, 5_000] {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let batch = create_loan_batch(n_rows, &mut rng);
        let config = TrainingConfig::new().with_features(feature_set()).with_model(
            ModelConfig::GradientBoosting(BoostingConfig::default().with_n_estimators(50)),
        );
        let trainer = Trainer::new(config);

        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &batch, |b, batch| {
            b.iter(|| trainer.fit(black_box(batch)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_fit);
criterion_main!(benches);
