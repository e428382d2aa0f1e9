//! Single-frame crowd risk classification.
//!
//! Fuses the five features extracted by the vision pipeline into one
//! interpretable score in [0, 1], a three-level status, and a strict
//! alert flag. Deterministic and total: every input produces a result.

use serde::{Deserialize, Serialize};

use crate::types::{RiskStatus, Sample};

/// Normalization caps. Each raw feature is divided by its cap and
/// clamped to 1.0; values are domain constants, not derived from data.
const CROWD_CAP: f64 = 50.0;
const DENSITY_CAP: f64 = 6.0;
const GROWTH_CAP: f64 = 4.0;
const MOVEMENT_CAP: f64 = 6.0;

/// Fusion weights, summing to 1.0.
const W_DENSITY: f64 = 0.35;
const W_CROWD: f64 = 0.25;
const W_GROWTH: f64 = 0.25;
const W_MOVEMENT: f64 = 0.15;

/// Status thresholds, left-inclusive on the upper bound.
const SAFE_BELOW: f64 = 0.35;
const WARNING_BELOW: f64 = 0.65;

/// Alert predicate constants. Stricter than the CRITICAL threshold so
/// borderline classifications driven by density alone do not page anyone.
const ALERT_MIN_CROWD: u32 = 25;
const ALERT_MIN_GROWTH: f64 = 1.0;

/// Output of the classifier for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Fused score in [0, 1], rounded to 2 decimal places
    pub risk_score: f64,
    pub status: RiskStatus,
    /// True only when status is CRITICAL and the crowd-size and
    /// density-growth conditions both hold
    pub alert: bool,
}

/// Classify a single frame's features.
pub fn compute_risk(
    crowd_count: u32,
    avg_density: f64,
    // Persisted alongside the score but not weighted into it
    _max_density: u32,
    density_growth: f64,
    movement_variance: f64,
) -> RiskAssessment {
    let crowd_factor = (crowd_count as f64 / CROWD_CAP).min(1.0);
    let density_factor = (avg_density / DENSITY_CAP).min(1.0);
    let growth_factor = (density_growth / GROWTH_CAP).min(1.0);
    let movement_factor = (movement_variance / MOVEMENT_CAP).min(1.0);

    let raw = W_DENSITY * density_factor
        + W_CROWD * crowd_factor
        + W_GROWTH * growth_factor
        + W_MOVEMENT * movement_factor;

    // A shrinking crowd can drive the growth term negative; the score
    // itself never leaves [0, 1].
    let risk_score = (raw.clamp(0.0, 1.0) * 100.0).round() / 100.0;

    let status = if risk_score < SAFE_BELOW {
        RiskStatus::Safe
    } else if risk_score < WARNING_BELOW {
        RiskStatus::Warning
    } else {
        RiskStatus::Critical
    };

    let alert = status == RiskStatus::Critical
        && crowd_count > ALERT_MIN_CROWD
        && density_growth > ALERT_MIN_GROWTH;

    RiskAssessment {
        risk_score,
        status,
        alert,
    }
}

impl RiskAssessment {
    /// Classify a [`Sample`] as received from the vision pipeline.
    pub fn from_sample(sample: &Sample) -> Self {
        compute_risk(
            sample.crowd_count,
            sample.avg_density,
            sample.max_density,
            sample.density_growth,
            sample.movement_variance,
        )
    }
}
