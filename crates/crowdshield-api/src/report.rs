//! Final run report.

use axum::extract::State;
use axum::Json;
use crowdshield_core::{Alert, RiskMetric, RunReport, TimelinePoint};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::state::AppState;

/// Fold the full history into the report aggregate.
pub fn aggregate(metrics: &[RiskMetric], alerts: &[Alert]) -> RunReport {
    RunReport {
        status: "COMPLETED".to_string(),
        total_frames: metrics.len(),
        max_risk: metrics
            .iter()
            .map(|m| m.risk_score)
            .fold(0.0, f64::max),
        max_crowd: metrics.iter().map(|m| m.crowd_count).max().unwrap_or(0),
        total_alerts: alerts.len(),
        risk_timeline: metrics
            .iter()
            .map(|m| TimelinePoint {
                time: m.timestamp,
                risk: m.risk_score,
            })
            .collect(),
    }
}

/// `GET /report` - `{"status":"RUNNING"}` until the completion signal
/// arrives, then the aggregate over the whole run. Read-only and
/// idempotent.
pub async fn report(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    if !state.analysis_completed() {
        return Ok(Json(json!({ "status": "RUNNING" })));
    }

    let metrics = state.store.all_metrics().await?;
    let alerts = state.store.all_alerts().await?;
    let report = aggregate(&metrics, &alerts);

    Ok(Json(serde_json::to_value(report).map_err(crowdshield_core::Error::from)?))
}
