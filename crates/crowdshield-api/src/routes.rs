//! Router assembly and the read-only REST endpoints.

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use crowdshield_core::{Alert, RiskMetric};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::{ingest, live, relay, report};

/// Build the axum router with all endpoints.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state);
    let body_limit = DefaultBodyLimit::max(state.config.http.max_body_size);

    Router::new()
        // write path (vision pipeline)
        .route("/ingest", post(ingest::ingest))
        .route("/frame", post(relay::receive_frame))
        // live distribution
        .route("/ws/live", get(live::ws_live))
        .route("/video", get(relay::video_feed))
        // REST reads
        .route("/risk/latest", get(risk_latest))
        .route("/risk/history", get(risk_history))
        .route("/alerts", get(alerts))
        .route("/report", get(report::report))
        // probes
        .route("/health", get(health))
        .route("/", get(root))
        .layer(cors)
        .layer(body_limit)
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = state
        .config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// `GET /risk/latest` - most recent metric, `null` before any ingestion.
async fn risk_latest(State(state): State<AppState>) -> ApiResult<Json<Option<RiskMetric>>> {
    Ok(Json(state.store.latest_metric().await?))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    100
}

/// `GET /risk/history?limit=N` - recent metrics, newest first.
async fn risk_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<RiskMetric>>> {
    Ok(Json(state.store.metric_history(query.limit).await?))
}

/// `GET /alerts` - raised alerts, newest first.
async fn alerts(State(state): State<AppState>) -> ApiResult<Json<Vec<Alert>>> {
    Ok(Json(state.store.alerts().await?))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "CrowdShield AI backend running" }))
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "CrowdShield AI Backend Running" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(ServerConfig::default()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn sample(crowd: u32, density: f64, growth: f64, movement: f64) -> Value {
        json!({
            "crowd_count": crowd,
            "avg_density": density,
            "max_density": 6,
            "density_growth": growth,
            "movement_variance": movement,
        })
    }

    #[tokio::test]
    async fn probes_answer_with_constant_payloads() {
        let app = app();

        let resp = app.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["status"],
            "CrowdShield AI backend running"
        );

        let resp = app.oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["status"],
            "CrowdShield AI Backend Running"
        );
    }

    #[tokio::test]
    async fn empty_store_reads_are_empty_not_errors() {
        let app = app();

        let resp = app.clone().oneshot(get("/risk/latest")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, Value::Null);

        let resp = app.clone().oneshot(get("/risk/history")).await.unwrap();
        assert_eq!(body_json(resp).await, json!([]));

        let resp = app.oneshot(get("/alerts")).await.unwrap();
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn full_run_ingest_report_reset_cycle() {
        let app = app();

        // three samples, the middle one critical enough to alert
        for body in [
            sample(10, 1.0, 0.2, 0.5),
            sample(40, 6.0, 3.0, 6.0),
            sample(20, 2.0, 0.5, 1.0),
        ] {
            let resp = app
                .clone()
                .oneshot(post_json("/ingest", body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        // report gated until completion
        let resp = app.clone().oneshot(get("/report")).await.unwrap();
        assert_eq!(body_json(resp).await, json!({ "status": "RUNNING" }));

        let resp = app
            .clone()
            .oneshot(post_json("/ingest", json!({ "completed": true })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.clone().oneshot(get("/report")).await.unwrap();
        let report = body_json(resp).await;
        assert_eq!(report["status"], "COMPLETED");
        assert_eq!(report["total_frames"], 3);
        assert_eq!(report["total_alerts"], 1);
        assert_eq!(report["max_crowd"], 40);
        assert_eq!(report["risk_timeline"].as_array().unwrap().len(), 3);

        // newest first on the read endpoints
        let resp = app
            .clone()
            .oneshot(get("/risk/history?limit=2"))
            .await
            .unwrap();
        let history = body_json(resp).await;
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[0]["crowd_count"], 20);

        let resp = app.clone().oneshot(get("/risk/latest")).await.unwrap();
        assert_eq!(body_json(resp).await["crowd_count"], 20);

        let resp = app.clone().oneshot(get("/alerts")).await.unwrap();
        let alerts = body_json(resp).await;
        assert_eq!(alerts.as_array().unwrap().len(), 1);
        assert_eq!(alerts[0]["message"], "Possible stampede detected");

        // reset wipes everything and regates the report
        let resp = app
            .clone()
            .oneshot(post_json("/ingest", json!({ "reset": true })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.clone().oneshot(get("/risk/history")).await.unwrap();
        assert_eq!(body_json(resp).await, json!([]));
        let resp = app.clone().oneshot(get("/alerts")).await.unwrap();
        assert_eq!(body_json(resp).await, json!([]));
        let resp = app.oneshot(get("/report")).await.unwrap();
        assert_eq!(body_json(resp).await, json!({ "status": "RUNNING" }));
    }

    #[tokio::test]
    async fn malformed_sample_is_rejected_with_422() {
        let app = app();
        let resp = app
            .oneshot(post_json("/ingest", json!({ "avg_density": 2.0 })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn video_endpoint_is_multipart_mjpeg() {
        let app = app();
        let resp = app.oneshot(get("/video")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace; boundary=frame"
        );
    }
}
