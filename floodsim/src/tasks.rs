//! Detached periodic tasks. The sampler lives for one attack run; the
//! blacklist eviction ticker lives for the whole process, attack or not.

use floodsim_core::{
    BlacklistStore, EventLog, MetricsAggregator, MetricsSnapshot, BLACKLIST_EVICTION_PERIOD,
    SNAPSHOT_HISTORY_CAPACITY,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Bounded record of once-per-second snapshots, for later inspection.
/// Independent of the 10s window used for live reads.
pub type SnapshotHistory = Arc<Mutex<VecDeque<MetricsSnapshot>>>;

pub fn snapshot_history() -> SnapshotHistory {
    Arc::new(Mutex::new(VecDeque::with_capacity(SNAPSHOT_HISTORY_CAPACITY)))
}

/// Takes one snapshot per elapsed second while the run flag holds.
pub(crate) async fn sampler_task(
    metrics: Arc<MetricsAggregator>,
    running: Arc<AtomicBool>,
    history: SnapshotHistory,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick completes instantly.
    interval.tick().await;

    while running.load(Ordering::Relaxed) {
        interval.tick().await;
        let snapshot = metrics.snapshot();
        let mut history = history.lock().unwrap();
        history.push_back(snapshot);
        if history.len() > SNAPSHOT_HISTORY_CAPACITY {
            history.pop_front();
        }
    }
}

/// Clears the blacklist on a fixed period for the lifetime of the process,
/// modeling the defending operator resetting their blocks. Spawn once at
/// process init and never join.
pub async fn blacklist_eviction_task(blacklist: Arc<BlacklistStore>, events: Arc<EventLog>) {
    loop {
        tokio::time::sleep(BLACKLIST_EVICTION_PERIOD).await;
        let evicted = blacklist.clear();
        if evicted > 0 {
            debug!("blacklist eviction dropped {evicted} entries");
            events.info(format!("defense reset: {evicted} blacklisted IPs released"));
        }
    }
}
