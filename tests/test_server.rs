//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use loan_risk::prelude::*;
use loan_risk::server::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

fn facade() -> ScoringFacade {
    static FACADE: OnceLock<ScoringFacade> = OnceLock::new();
    FACADE
        .get_or_init(|| {
            let records = (0..150usize)
                .map(|i| {
                    let income = 30_000.0 + ((i * 19) % 41) as f64 * 2_500.0;
                    let credit = 60_000.0 + ((i * 7) % 53) as f64 * 8_000.0;
                    let target = if (credit / income > 6.0) != (i % 11 == 0) { 1.0 } else { 0.0 };
                    Record::new()
                        .with("CODE_GENDER", if i % 2 == 0 { "M" } else { "F" })
                        .with("AMT_INCOME_TOTAL", income)
                        .with("AMT_CREDIT", credit)
                        .with("TARGET", target)
                })
                .collect();
            let features = FeatureSet::new("TARGET")
                .with_feature(FeatureSpec::binary("CODE_GENDER"))
                .with_feature(FeatureSpec::numeric("AMT_INCOME_TOTAL"))
                .with_feature(FeatureSpec::numeric("AMT_CREDIT"));
            let config = TrainingConfig::new()
                .with_features(features)
                .with_model(ModelConfig::GradientBoosting(
                    BoostingConfig::default().with_n_estimators(15),
                ));
            let bundle = Trainer::new(config)
                .fit(&TrainingBatch::from_records(records))
                .unwrap();
            ScoringFacade::new(bundle)
        })
        .clone()
}

fn test_app() -> axum::Router {
    test_app_with(ServingConfig::default().with_max_batch_size(3))
}

fn test_app_with(config: ServingConfig) -> axum::Router {
    let state = Arc::new(AppState::new(facade(), config));
    create_router(state)
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["fit_id"], facade().bundle().fit_id().to_string());
}

#[tokio::test]
async fn test_schema_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/schema")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let columns = body["schema"]["columns"].as_array().unwrap();
    assert_eq!(columns.len(), facade().schema().n_columns());
    assert_eq!(columns[0], "CODE_GENDER");
}

#[tokio::test]
async fn test_score_endpoint() {
    let app = test_app();
    let record = json!({"CODE_GENDER": "F", "AMT_INCOME_TOTAL": 42000.0, "AMT_CREDIT": 380000});
    let response = app
        .oneshot(post_json("/api/score", json!({ "record": record }).to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let expected: Record = serde_json::from_value(record).unwrap();
    let p = facade().score(&expected).unwrap();
    assert_eq!(body["probability"].as_f64().unwrap(), p);
    assert_eq!(body["threshold"], 0.5);
    assert_eq!(body["is_default"], p >= 0.5);
}

#[tokio::test]
async fn test_score_with_custom_threshold() {
    let app = test_app();
    let body = json!({"record": {"CODE_GENDER": "M"}, "threshold": 0.0}).to_string();
    let response = app.oneshot(post_json("/api/score", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["threshold"], 0.0);
    assert_eq!(body["is_default"], true);
}

#[tokio::test]
async fn test_threshold_out_of_range() {
    let app = test_app();
    let body = json!({"record": {}, "threshold": 1.5}).to_string();
    let response = app.oneshot(post_json("/api/score", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json() {
    let app = test_app();
    let response = app
        .oneshot(post_json("/api/score", "{\"record\": ".to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_unscorable_record() {
    let app = test_app();
    let body = json!({"record": {"AMT_INCOME_TOTAL": "plenty"}}).to_string();
    let response = app.oneshot(post_json("/api/score", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("AMT_INCOME_TOTAL"));
}

#[tokio::test]
async fn test_batch_scoring_isolates_failures() {
    let app = test_app();
    let body = json!({
        "records": [
            {"CODE_GENDER": "F", "AMT_CREDIT": 120000},
            {"AMT_CREDIT": "n/a"},
            {"CODE_GENDER": "unknown"}
        ]
    })
    .to_string();
    let response = app.oneshot(post_json("/api/score/batch", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["failed"], 1);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0]["probability"].is_number());
    assert!(results[1]["error"].is_string());
    assert!(results[1].get("probability").is_none());
    assert!(results[2]["probability"].is_number());
}

#[tokio::test]
async fn test_batch_size_limit() {
    let app = test_app();
    let body = json!({"records": [{}, {}, {}, {}]}).to_string();
    let response = app.oneshot(post_json("/api/score/batch", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_slow_batch_times_out() {
    let app = test_app_with(
        ServingConfig::default()
            .with_timeout_ms(1)
            .with_max_batch_size(50_000),
    );
    let records: Vec<Value> = (0..40_000)
        .map(|i| json!({"AMT_CREDIT": 60_000 + i}))
        .collect();
    let body = json!({ "records": records }).to_string();
    let response = app.oneshot(post_json("/api/score/batch", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().contains("timed out after 1 ms"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/score")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
