//! Integration test: training and serving see the same features

use loan_risk::prelude::*;
use loan_risk::preprocessing::transform_records;
use loan_risk::schema::DAYS_EMPLOYED_ANOMALY;
use ndarray::Array2;

fn training_batch(n: usize) -> TrainingBatch {
    let education = ["Higher education", "Secondary / secondary special", "Incomplete higher"];
    let income_type = ["Working", "Pensioner", "Commercial associate", "State servant"];
    let records = (0..n)
        .map(|i| {
            let credit = 45_000.0 + ((i * 37) % 101) as f64 * 9_000.0;
            let income = 27_000.0 + ((i * 11) % 23) as f64 * 12_500.0;
            let ext = ((i * 29) % 97) as f64 / 97.0;
            let days_employed = if i % 9 == 0 {
                DAYS_EMPLOYED_ANOMALY
            } else {
                -(((i * 53) % 4_000) as f64 + 30.0)
            };
            let risky = credit / income > 6.0 || ext < 0.2;
            let target = if risky != (i % 13 == 0) { 1.0 } else { 0.0 };

            Record::new()
                .with("NAME_CONTRACT_TYPE", if i % 5 == 0 { "Revolving loans" } else { "Cash loans" })
                .with("CODE_GENDER", match i % 7 {
                    0 => "XNA",
                    1 | 3 | 5 => "F",
                    _ => "M",
                })
                .with("FLAG_OWN_CAR", if i % 3 == 0 { "Y" } else { "N" })
                .with("FLAG_OWN_REALTY", if i % 4 == 0 { "N" } else { "Y" })
                .with("CNT_CHILDREN", (i % 4) as f64)
                .with("AMT_INCOME_TOTAL", income)
                .with("AMT_CREDIT", credit)
                .with("AMT_GOODS_PRICE", if i % 11 == 0 { None } else { Some(credit * 0.9) })
                .with("NAME_INCOME_TYPE", income_type[i % income_type.len()])
                .with("NAME_EDUCATION_TYPE", education[(i / 2) % education.len()])
                .with("DAYS_BIRTH", -(7_500.0 + ((i * 131) % 17_000) as f64))
                .with("DAYS_EMPLOYED", days_employed)
                .with("CNT_FAM_MEMBERS", (i % 4 + 1) as f64)
                .with("EXT_SOURCE_1", if i % 4 == 0 { None } else { Some(ext) })
                .with("EXT_SOURCE_2", (ext + 0.3) / 1.3)
                .with("EXT_SOURCE_3", if i % 6 == 0 { None } else { Some(1.0 - ext) })
                .with("TARGET", target)
        })
        .collect();
    TrainingBatch::from_records(records)
}

fn fit(batch: &TrainingBatch, model: ModelConfig) -> ArtifactBundle {
    let config = TrainingConfig::new().with_model(model);
    Trainer::new(config).fit(batch).unwrap()
}

fn boosting() -> ModelConfig {
    ModelConfig::GradientBoosting(BoostingConfig::default().with_n_estimators(25))
}

fn training_matrix(bundle: &ArtifactBundle, batch: &TrainingBatch) -> Array2<f64> {
    transform_records(batch.records(), bundle.schema(), bundle.encoder(), bundle.scaler()).unwrap()
}

#[test]
fn test_single_record_encoding_matches_training_rows() {
    let batch = training_batch(240);
    let bundle = fit(&batch, boosting());
    let matrix = training_matrix(&bundle, &batch);
    let facade = ScoringFacade::new(bundle);

    assert_eq!(matrix.ncols(), facade.schema().n_columns());
    for (i, record) in batch.records().iter().enumerate() {
        let served = facade.encode(record).unwrap();
        assert_eq!(served, matrix.row(i).to_vec(), "row {} diverged", i);
    }
}

#[test]
fn test_single_record_scores_match_batch_predictions() {
    let batch = training_batch(240);
    for model in [boosting(), ModelConfig::Logistic(LogisticConfig::default())] {
        let bundle = fit(&batch, model);
        let matrix = training_matrix(&bundle, &batch);
        let batch_proba = bundle.model().predict_proba(&matrix).unwrap();
        let facade = ScoringFacade::new(bundle);

        for (i, record) in batch.records().iter().enumerate() {
            let p = facade.score(record).unwrap();
            assert!((p - batch_proba[i]).abs() < 1e-12, "row {}: {} vs {}", i, p, batch_proba[i]);
        }
    }
}

#[test]
fn test_batch_encoding_is_a_loop_over_single_records() {
    let batch = training_batch(120);
    let facade = ScoringFacade::new(fit(&batch, boosting()));
    let records = &batch.records()[..20];

    let matrix = facade.encode_batch(records).unwrap();
    for (i, record) in records.iter().enumerate() {
        assert_eq!(matrix.row(i).to_vec(), facade.encode(record).unwrap());
    }
}

#[test]
fn test_schema_columns_follow_field_order() {
    let batch = training_batch(120);
    let bundle = fit(&batch, boosting());
    let columns = bundle.schema().columns();

    assert_eq!(columns[0], "NAME_CONTRACT_TYPE");
    let genders: Vec<&str> = columns
        .iter()
        .filter(|c| c.starts_with("CODE_GENDER="))
        .map(|c| c.as_str())
        .collect();
    // XNA is rewritten to M before encoding, so it never gets a column
    assert_eq!(genders, vec!["CODE_GENDER=M", "CODE_GENDER=F"]);
    assert_eq!(bundle.scaler().columns(), columns);
    assert_eq!(bundle.model().n_features(), columns.len());
}

#[test]
fn test_employment_anomaly_is_imputed_like_a_missing_value() {
    let batch = training_batch(120);
    let facade = ScoringFacade::new(fit(&batch, boosting()));
    let base = batch.records()[1].clone();

    let anomalous = base.clone().with("DAYS_EMPLOYED", DAYS_EMPLOYED_ANOMALY);
    let mut absent = base;
    absent.remove("DAYS_EMPLOYED");

    assert_eq!(facade.encode(&anomalous).unwrap(), facade.encode(&absent).unwrap());
}

#[test]
fn test_string_numbers_encode_like_numbers() {
    let batch = training_batch(120);
    let facade = ScoringFacade::new(fit(&batch, boosting()));
    let base = batch.records()[2].clone();

    let as_text = base.clone().with("AMT_CREDIT", "180000").with("CNT_CHILDREN", " 2 ");
    let as_number = base.with("AMT_CREDIT", 180_000.0).with("CNT_CHILDREN", 2.0);
    assert_eq!(facade.encode(&as_text).unwrap(), facade.encode(&as_number).unwrap());
}

#[test]
fn test_numeric_flags_accept_text_labels() {
    let records: Vec<Record> = training_batch(120)
        .records()
        .iter()
        .enumerate()
        .map(|(i, r)| r.clone().with("FLAG_EMAIL", (i % 2) as f64))
        .collect();
    let batch = TrainingBatch::from_records(records);
    let features = FeatureSet::new("TARGET")
        .with_feature(FeatureSpec::binary("FLAG_EMAIL"))
        .with_feature(FeatureSpec::numeric("AMT_CREDIT"))
        .with_feature(FeatureSpec::numeric("EXT_SOURCE_2"));
    let config = TrainingConfig::new().with_features(features).with_model(boosting());
    let facade = ScoringFacade::new(Trainer::new(config).fit(&batch).unwrap());
    assert_eq!(facade.schema().columns()[0], "FLAG_EMAIL");

    let base = Record::new().with("AMT_CREDIT", 180_000.0).with("EXT_SOURCE_2", 0.4);
    let as_number = facade.encode(&base.clone().with("FLAG_EMAIL", 1.0)).unwrap();
    assert_eq!(as_number[0], 1.0);
    for text in ["1", "1.0", " 1.00 "] {
        let as_text = facade.encode(&base.clone().with("FLAG_EMAIL", text)).unwrap();
        assert_eq!(as_text, as_number, "label {:?}", text);
    }
}
