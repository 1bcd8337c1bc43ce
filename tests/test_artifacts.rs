//! Integration test: artifact persistence and sibling verification

use loan_risk::artifacts::{MODEL_FILE, SCALER_FILE, SCHEMA_FILE};
use loan_risk::prelude::*;
use std::fs;
use std::path::Path;

fn training_batch(seed: usize) -> TrainingBatch {
    let records = (0..160usize)
        .map(|i| {
            let k = i + seed;
            let amount = 20_000.0 + ((k * 41) % 83) as f64 * 5_000.0;
            let score = ((k * 17) % 59) as f64 / 59.0;
            let target = if (amount > 250_000.0 && score < 0.6) != (k % 19 == 0) { 1.0 } else { 0.0 };
            Record::new()
                .with("CONTRACT", if k % 4 == 0 { "Revolving" } else { "Cash" })
                .with("REGION", ["north", "south", "east"][k % 3])
                .with("AMT_CREDIT", amount)
                .with("EXT_SCORE", if k % 10 == 0 { None } else { Some(score) })
                .with("TARGET", target)
        })
        .collect();
    TrainingBatch::from_records(records)
}

fn fit(seed: usize) -> ArtifactBundle {
    let features = FeatureSet::new("TARGET")
        .with_feature(FeatureSpec::binary("CONTRACT"))
        .with_feature(FeatureSpec::one_hot("REGION"))
        .with_feature(FeatureSpec::numeric("AMT_CREDIT"))
        .with_feature(FeatureSpec::numeric("EXT_SCORE"));
    let config = TrainingConfig::new()
        .with_features(features)
        .with_model(ModelConfig::GradientBoosting(
            BoostingConfig::default().with_n_estimators(20),
        ));
    Trainer::new(config).fit(&training_batch(seed)).unwrap()
}

fn probe() -> Vec<Record> {
    vec![
        Record::new()
            .with("CONTRACT", "Cash")
            .with("REGION", "south")
            .with("AMT_CREDIT", 310_000.0)
            .with("EXT_SCORE", 0.25),
        Record::new().with("REGION", "west").with("AMT_CREDIT", 9_999_999.0),
        Record::new(),
    ]
}

fn copy_file(from: &Path, to: &Path, name: &str) {
    fs::copy(from.join(name), to.join(name)).unwrap();
}

#[test]
fn test_round_trip_preserves_scores() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();

    for name in [SCHEMA_FILE, SCALER_FILE, MODEL_FILE] {
        assert!(dir.path().join(name).is_file(), "{} not written", name);
    }

    let before = ScoringFacade::new(bundle.clone());
    let after = ScoringFacade::load(dir.path()).unwrap();

    assert_eq!(after.bundle().fit_id(), bundle.fit_id());
    assert_eq!(after.schema(), bundle.schema());
    assert_eq!(after.bundle().encoder(), bundle.encoder());
    assert_eq!(after.bundle().scaler(), bundle.scaler());
    assert_eq!(after.bundle().report(), bundle.report());
    for record in probe() {
        assert_eq!(after.score(&record).unwrap(), before.score(&record).unwrap());
    }
}

#[test]
fn test_headers_are_shared_across_files() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();

    let fit_id = bundle.fit_id().to_string();
    for name in [SCHEMA_FILE, SCALER_FILE, MODEL_FILE] {
        let text = fs::read_to_string(dir.path().join(name)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["header"]["fit_id"], fit_id.as_str());
        assert_eq!(value["header"]["format_version"], 1);
        assert_eq!(
            value["header"]["schema_fingerprint"],
            bundle.schema().fingerprint()
        );
    }
}

#[test]
fn test_mixed_fits_are_rejected() {
    let first = fit(0);
    let second = fit(7);
    assert_ne!(first.fit_id(), second.fit_id());

    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    first.save(a.path()).unwrap();
    second.save(b.path()).unwrap();

    // scaler from run B next to schema and model from run A
    copy_file(b.path(), a.path(), SCALER_FILE);
    let err = ArtifactBundle::load(a.path()).unwrap_err();
    assert!(matches!(err, RiskError::SchemaError(_)), "got {err:?}");
}

#[test]
fn test_missing_sibling_is_rejected() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();
    fs::remove_file(dir.path().join(MODEL_FILE)).unwrap();

    let err = ScoringFacade::load(dir.path()).unwrap_err();
    assert!(matches!(err, RiskError::SchemaError(_)), "got {err:?}");
}

#[test]
fn test_corrupt_file_is_a_serialization_error() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();
    fs::write(dir.path().join(SCALER_FILE), "{ \"header\": ").unwrap();

    let err = ArtifactBundle::load(dir.path()).unwrap_err();
    assert!(matches!(err, RiskError::SerializationError(_)), "got {err:?}");
}

#[test]
fn test_tampered_schema_is_rejected() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();

    let path = dir.path().join(SCHEMA_FILE);
    let text = fs::read_to_string(&path).unwrap();
    let tampered = text.replacen("\"REGION=north\"", "\"REGION=mars\"", 1);
    assert_ne!(text, tampered);
    fs::write(&path, tampered).unwrap();

    let err = ArtifactBundle::load(dir.path()).unwrap_err();
    assert!(matches!(err, RiskError::SchemaError(_)), "got {err:?}");
}

#[test]
fn test_format_version_is_checked() {
    let bundle = fit(0);
    let dir = tempfile::tempdir().unwrap();
    bundle.save(dir.path()).unwrap();

    for name in [SCHEMA_FILE, SCALER_FILE, MODEL_FILE] {
        let path = dir.path().join(name);
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["header"]["format_version"] = serde_json::json!(2);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    let err = ArtifactBundle::load(dir.path()).unwrap_err();
    assert!(matches!(err, RiskError::SchemaError(_)), "got {err:?}");
}

#[test]
fn test_load_from_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ArtifactBundle::load(dir.path()),
        Err(RiskError::SchemaError(_))
    ));
}
