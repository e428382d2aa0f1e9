//! Ingestion endpoint: the write path of the whole backend.
//!
//! One endpoint, three mutually exclusive cases in priority order:
//! reset signal, completion signal, normal sample. Samples are
//! classified server-side; the caller's own `risk_score`/`status`
//! fields, if present, are ignored rather than trusted.

use axum::extract::State;
use axum::Json;
use crowdshield_core::{Error, LiveEvent, RiskAssessment, Sample};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::store::{NewAlert, NewMetric};

const ALERT_MESSAGE: &str = "Possible stampede detected";

/// `POST /ingest`
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    if body.get("reset").and_then(Value::as_bool) == Some(true) {
        return reset(&state).await;
    }

    if body.get("completed").and_then(Value::as_bool) == Some(true) {
        return complete(&state).await;
    }

    sample(&state, body).await
}

/// Clear all history and rearm the run. The store's write lock
/// serializes the delete against any in-flight sample insert.
async fn reset(state: &AppState) -> ApiResult<Json<Value>> {
    state.store.clear_all().await?;
    state.set_analysis_completed(false);

    state.broadcaster.broadcast(&LiveEvent::Reset).await;
    tracing::info!("run reset, history cleared");

    Ok(Json(json!({ "message": "Backend reset successful" })))
}

/// Mark the run finished. Stored data is untouched.
async fn complete(state: &AppState) -> ApiResult<Json<Value>> {
    state.set_analysis_completed(true);

    state.broadcaster.broadcast(&LiveEvent::Completed).await;
    tracing::info!("analysis run completed");

    Ok(Json(json!({ "message": "Video analysis completed" })))
}

/// Classify, persist, and fan out one sample.
async fn sample(state: &AppState, body: Value) -> ApiResult<Json<Value>> {
    let sample: Sample =
        serde_json::from_value(body).map_err(|e| Error::Validation(e.to_string()))?;

    let assessment = RiskAssessment::from_sample(&sample);

    let alert = assessment.alert.then(|| NewAlert {
        risk_score: assessment.risk_score,
        status: assessment.status,
        message: ALERT_MESSAGE.to_string(),
    });
    if alert.is_some() {
        tracing::warn!(
            crowd_count = sample.crowd_count,
            risk_score = assessment.risk_score,
            "critical crowd conditions, raising alert"
        );
    }

    let stored = state
        .store
        .record(
            NewMetric {
                crowd_count: sample.crowd_count,
                avg_density: sample.avg_density,
                max_density: sample.max_density,
                risk_score: assessment.risk_score,
                status: assessment.status,
            },
            alert,
        )
        .await?;

    state
        .broadcaster
        .broadcast(&LiveEvent::Live {
            crowd_count: stored.crowd_count,
            avg_density: stored.avg_density,
            max_density: stored.max_density,
            risk_score: stored.risk_score,
            status: stored.status,
            timestamp: stored.timestamp.timestamp_micros() as f64 / 1e6,
        })
        .await;

    Ok(Json(json!({ "ok": true })))
}
