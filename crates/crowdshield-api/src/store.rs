//! Metric persistence seam.
//!
//! The backend only needs an append-mostly log of metrics and alerts
//! with ordered reads and a run-scoped delete-all, so the store is a
//! trait and the default implementation keeps both tables in memory.
//! A durable backend slots in behind the same trait.

use async_trait::async_trait;
use chrono::Utc;
use crowdshield_core::{Alert, Result, RiskMetric, RiskStatus};
use tokio::sync::RwLock;

/// Metric row as produced by ingestion, before the store assigns
/// an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewMetric {
    pub crowd_count: u32,
    pub avg_density: f64,
    pub max_density: u32,
    pub risk_score: f64,
    pub status: RiskStatus,
}

/// Alert row pending insertion.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub risk_score: f64,
    pub status: RiskStatus,
    pub message: String,
}

/// Append-only store of metric and alert history.
///
/// `record` persists a metric and its optional alert as one unit: either
/// both rows land or neither does. `clear_all` and `record` must be
/// serialized against each other so no metric survives a reset that
/// logically preceded it.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Insert one metric row plus, atomically, its alert row if any.
    /// Returns the stored metric with server-assigned id and timestamp.
    async fn record(&self, metric: NewMetric, alert: Option<NewAlert>) -> Result<RiskMetric>;

    /// Delete all metric and alert rows.
    async fn clear_all(&self) -> Result<()>;

    /// Most recently inserted metric, if any.
    async fn latest_metric(&self) -> Result<Option<RiskMetric>>;

    /// Up to `limit` metrics, newest first.
    async fn metric_history(&self, limit: usize) -> Result<Vec<RiskMetric>>;

    /// All alerts, newest first.
    async fn alerts(&self) -> Result<Vec<Alert>>;

    /// Full metric history in insertion order.
    async fn all_metrics(&self) -> Result<Vec<RiskMetric>>;

    /// Full alert history in insertion order.
    async fn all_alerts(&self) -> Result<Vec<Alert>>;
}

#[derive(Debug, Default)]
struct Tables {
    metrics: Vec<RiskMetric>,
    alerts: Vec<Alert>,
    next_metric_id: u64,
    next_alert_id: u64,
}

/// In-memory [`MetricStore`]. A single `RwLock` over both tables gives
/// the write-side serialization the ingestion path requires; the read
/// endpoints share the read lock freely.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn record(&self, metric: NewMetric, alert: Option<NewAlert>) -> Result<RiskMetric> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        tables.next_metric_id += 1;
        let stored = RiskMetric {
            id: tables.next_metric_id,
            crowd_count: metric.crowd_count,
            avg_density: metric.avg_density,
            max_density: metric.max_density,
            risk_score: metric.risk_score,
            status: metric.status,
            timestamp: now,
        };
        tables.metrics.push(stored.clone());

        if let Some(alert) = alert {
            tables.next_alert_id += 1;
            let id = tables.next_alert_id;
            tables.alerts.push(Alert {
                id,
                risk_score: alert.risk_score,
                status: alert.status,
                message: alert.message,
                timestamp: now,
            });
        }

        Ok(stored)
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.metrics.clear();
        tables.alerts.clear();
        Ok(())
    }

    async fn latest_metric(&self) -> Result<Option<RiskMetric>> {
        Ok(self.tables.read().await.metrics.last().cloned())
    }

    async fn metric_history(&self, limit: usize) -> Result<Vec<RiskMetric>> {
        let tables = self.tables.read().await;
        Ok(tables.metrics.iter().rev().take(limit).cloned().collect())
    }

    async fn alerts(&self) -> Result<Vec<Alert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().rev().cloned().collect())
    }

    async fn all_metrics(&self) -> Result<Vec<RiskMetric>> {
        Ok(self.tables.read().await.metrics.clone())
    }

    async fn all_alerts(&self) -> Result<Vec<Alert>> {
        Ok(self.tables.read().await.alerts.clone())
    }
}
