//! Shared application state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::live::LiveBroadcaster;
use crate::relay::FrameRelay;
use crate::store::{MemoryStore, MetricStore};

/// State shared by every request handler. Cheap to clone; all fields
/// are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn MetricStore>,
    pub broadcaster: Arc<LiveBroadcaster>,
    pub relay: Arc<FrameRelay>,
    /// Set by the completion signal, cleared by reset. Gates `/report`.
    analysis_completed: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(config, store)
    }

    /// Build state over a caller-supplied store (tests, durable backends).
    pub fn with_store(config: ServerConfig, store: Arc<dyn MetricStore>) -> Self {
        Self {
            broadcaster: Arc::new(LiveBroadcaster::new(config.live.subscriber_queue_depth)),
            relay: Arc::new(FrameRelay::new(config.stream.jpeg_quality)),
            config: Arc::new(config),
            store,
            analysis_completed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn analysis_completed(&self) -> bool {
        self.analysis_completed.load(Ordering::Acquire)
    }

    pub fn set_analysis_completed(&self, completed: bool) {
        self.analysis_completed.store(completed, Ordering::Release);
    }
}
