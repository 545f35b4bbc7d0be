//! Attack-side engine: the worker loop, the orchestrator that owns the
//! worker pool, and the detached background tasks (metrics sampler,
//! blacklist eviction ticker).

pub mod orchestrator;
pub mod tasks;
pub(crate) mod worker;

pub use orchestrator::{AttackOrchestrator, RunPhase};

use floodsim_core::{BlacklistStore, EventLog, MetricsAggregator};
use std::sync::Arc;

/// State reachable from every worker: the aggregator they report into, the
/// blacklist they probe and feed, and the event sink. Injected at spawn
/// time; nothing here lives in implicit global scope.
#[derive(Clone, Default)]
pub struct SharedState {
    pub metrics: Arc<MetricsAggregator>,
    pub blacklist: Arc<BlacklistStore>,
    pub events: Arc<EventLog>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}
