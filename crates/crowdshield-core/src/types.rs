//! Fundamental types for the CrowdShield backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk status derived from the classifier score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskStatus {
    Safe,
    Warning,
    Critical,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::Safe => "SAFE",
            RiskStatus::Warning => "WARNING",
            RiskStatus::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One crowd-analysis measurement produced by the vision pipeline
/// for a single processed video frame. Transient: classified and
/// persisted as a [`RiskMetric`], never stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Number of detected people in the frame
    pub crowd_count: u32,
    /// Mean occupancy across grid cells
    pub avg_density: f64,
    /// Peak occupancy of a single grid cell
    pub max_density: u32,
    /// Rate of density change between frames
    #[serde(default)]
    pub density_growth: f64,
    /// Motion-chaos indicator
    #[serde(default)]
    pub movement_variance: f64,
}

/// Persisted per-frame risk record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetric {
    pub id: u64,
    pub crowd_count: u32,
    pub avg_density: f64,
    pub max_density: u32,
    pub risk_score: f64,
    pub status: RiskStatus,
    pub timestamp: DateTime<Utc>,
}

/// Persisted alert raised by a CRITICAL classification that also
/// passed the strict alert predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub risk_score: f64,
    pub status: RiskStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Event pushed to live websocket subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveEvent {
    /// All persisted history was cleared; a new run is starting.
    #[serde(rename = "RESET")]
    Reset,
    /// The upstream analysis run finished; the final report is available.
    #[serde(rename = "COMPLETED")]
    Completed,
    /// One classified sample, pushed as it was ingested.
    #[serde(rename = "LIVE")]
    Live {
        crowd_count: u32,
        avg_density: f64,
        max_density: u32,
        risk_score: f64,
        status: RiskStatus,
        timestamp: f64,
    },
}

/// One point of the final report's risk timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub time: DateTime<Utc>,
    pub risk: f64,
}

/// Aggregate computed over the full metric history once a run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: String,
    pub total_frames: usize,
    pub max_risk: f64,
    pub max_crowd: u32,
    pub total_alerts: usize,
    pub risk_timeline: Vec<TimelinePoint>,
}
