//! Request handlers

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::ScoringFacade;
use crate::record::Record;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub record: Record,
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BatchScoreRequest {
    pub records: Vec<Record>,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub probability: f64,
    pub threshold: f64,
    pub is_default: bool,
    pub fit_id: String,
}

/// One slot of a batch response; exactly one of `probability`/`error` is set
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn parse_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(v)| v)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

fn resolve_threshold(state: &AppState, requested: Option<f64>) -> Result<f64> {
    match requested {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(ServerError::BadRequest(format!(
            "threshold must be in [0, 1], got {}",
            t
        ))),
        Some(t) => Ok(t),
        None => Ok(state.config.classification_threshold),
    }
}

/// Run a scoring closure on the blocking pool under the configured timeout
async fn run_scoring<T, F>(state: &AppState, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ScoringFacade) -> T + Send + 'static,
{
    let facade = state.facade.clone();
    let timeout_ms = state.config.request_timeout_ms;
    let task = tokio::task::spawn_blocking(move || work(&facade));

    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) => Err(ServerError::Internal(format!("scoring task failed: {}", join))),
        Err(_) => Err(ServerError::Timeout(timeout_ms)),
    }
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "fit_id": state.facade.bundle().fit_id().to_string(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<Value> {
    let bundle = state.facade.bundle();
    Json(json!({
        "fit_id": bundle.fit_id().to_string(),
        "fitted_at": bundle.header().fitted_at.to_rfc3339(),
        "schema": bundle.schema(),
    }))
}

pub async fn score(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>> {
    let request = parse_body(body)?;
    let threshold = resolve_threshold(&state, request.threshold)?;
    let start = Instant::now();

    let record = request.record;
    let classification = run_scoring(&state, move |facade| facade.classify(&record, threshold)).await??;

    debug!(
        probability = classification.probability,
        elapsed_us = start.elapsed().as_micros() as u64,
        "Record scored"
    );
    Ok(Json(ScoreResponse {
        probability: classification.probability,
        threshold,
        is_default: classification.is_default,
        fit_id: state.facade.bundle().fit_id().to_string(),
    }))
}

pub async fn score_batch(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<BatchScoreRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let request = parse_body(body)?;
    let threshold = resolve_threshold(&state, request.threshold)?;
    if request.records.len() > state.config.max_batch_size {
        return Err(ServerError::BadRequest(format!(
            "batch of {} records exceeds the limit of {}",
            request.records.len(),
            state.config.max_batch_size
        )));
    }

    let records = request.records;
    let results = run_scoring(&state, move |facade| facade.score_batch(&records)).await?;

    let items: Vec<BatchItem> = results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(p) => BatchItem {
                index,
                probability: Some(p),
                is_default: Some(p >= threshold),
                error: None,
            },
            Err(e) => BatchItem {
                index,
                probability: None,
                is_default: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    let failed = items.iter().filter(|i| i.error.is_some()).count();

    Ok(Json(json!({
        "fit_id": state.facade.bundle().fit_id().to_string(),
        "threshold": threshold,
        "failed": failed,
        "results": items,
    })))
}
