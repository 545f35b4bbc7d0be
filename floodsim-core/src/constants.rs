use std::time::Duration;

/// Number of (latency, status) pairs retained by the aggregator.
pub const SAMPLE_CAPACITY: usize = 100;

/// Trailing window the derived rates are computed over.
pub const METRICS_WINDOW: Duration = Duration::from_secs(10);

/// Empirically observed mean spacing between worker iterations. The
/// aggregator stores no per-sample timestamps and instead infers an
/// approximate time from buffer position at this spacing.
pub const ITERATION_SPACING_SECS: f64 = 0.1;

/// Idle gap after which a trailing 429 is considered still in effect.
pub const RATE_LIMITED_IDLE_GAP: Duration = Duration::from_secs(1);

/// Snapshots retained by the per-second sampler.
pub const SNAPSHOT_HISTORY_CAPACITY: usize = 100;

/// Period of the global blacklist eviction ticker.
pub const BLACKLIST_EVICTION_PERIOD: Duration = Duration::from_secs(10);

/// Latency assigned to a synthetic transport-failure outcome.
pub const SYNTHETIC_FAILURE_LATENCY_MS: f64 = 1000.0;
