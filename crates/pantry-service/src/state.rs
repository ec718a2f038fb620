//! Application state.

use std::sync::Arc;

use pantry_engine::{PantryEngine, SchedulerStatus};
use tokio::sync::watch;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The depletion engine.
    pub engine: Arc<PantryEngine>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Status feed of the background scheduler, when one is running.
    pub scheduler: Option<watch::Receiver<SchedulerStatus>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(engine: Arc<PantryEngine>, config: ServiceConfig) -> Self {
        Self {
            engine,
            config,
            scheduler: None,
        }
    }

    /// Attach the scheduler's status feed.
    #[must_use]
    pub fn with_scheduler(mut self, status: watch::Receiver<SchedulerStatus>) -> Self {
        self.scheduler = Some(status);
        self
    }

    /// Latest scheduler status, if a scheduler is attached.
    #[must_use]
    pub fn scheduler_status(&self) -> Option<SchedulerStatus> {
        self.scheduler.as_ref().map(|rx| rx.borrow().clone())
    }
}
