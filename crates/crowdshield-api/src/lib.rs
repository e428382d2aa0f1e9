//! # CrowdShield API
//!
//! Axum server for real-time crowd-risk monitoring.
//!
//! ## Endpoints
//!
//! ### Ingestion (vision pipeline → backend)
//! - `POST /ingest` - classified sample, reset signal, or completion signal
//! - `POST /frame` - multipart upload of the latest annotated video frame
//!
//! ### Live distribution (backend → dashboards)
//! - `WS /ws/live` - JSON event push (`RESET` | `COMPLETED` | `LIVE`)
//! - `GET /video` - multipart MJPEG stream of the latest frame, ~20 fps
//!
//! ### REST
//! - `GET /risk/latest` - most recent metric
//! - `GET /risk/history?limit=N` - recent metrics, newest first
//! - `GET /alerts` - raised alerts, newest first
//! - `GET /report` - final run report once analysis has completed
//! - `GET /health`, `GET /` - liveness probes

pub mod config;
pub mod error;
pub mod ingest;
pub mod live;
pub mod relay;
pub mod report;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;

pub use config::ServerConfig;
pub use server::run;
pub use state::AppState;
