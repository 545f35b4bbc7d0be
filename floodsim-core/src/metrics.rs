use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

/// The unit of observation fed into the aggregator. Synthetic outcomes
/// (transport failure, idle-gap 429) are indistinguishable from real ones.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub latency_ms: f64,
    pub status_code: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackStatus {
    Stopped,
    Running,
    RateLimited,
}

impl fmt::Display for AttackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackStatus::Stopped => write!(f, "stopped"),
            AttackStatus::Running => write!(f, "running"),
            AttackStatus::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// Derived statistics over the trailing window. Recomputed on every read,
/// never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub avg_response_time_ms: f64,
    pub success_rate_pct: f64,
    pub rate_limited_rate_pct: f64,
    pub failure_rate_pct: f64,
    pub requests_per_second: f64,
    pub status: AttackStatus,
}

impl MetricsSnapshot {
    pub fn idle() -> Self {
        Self {
            avg_response_time_ms: 0.0,
            success_rate_pct: 0.0,
            rate_limited_rate_pct: 0.0,
            failure_rate_pct: 0.0,
            requests_per_second: 0.0,
            status: AttackStatus::Stopped,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "avg={:.1}ms, success={:.1}%, rate_limited={:.1}%, failure={:.1}%, rps={:.2}, status={}",
            self.avg_response_time_ms,
            self.success_rate_pct,
            self.rate_limited_rate_pct,
            self.failure_rate_pct,
            self.requests_per_second,
            self.status,
        )
    }
}

/// Fixed-capacity ring buffers of recent (latency, status) pairs, held in
/// matched positional order. No per-sample timestamps are stored: buffer
/// position stands in for time at the ~0.1s per-iteration spacing, which is
/// how entries are mapped onto the trailing 10s window.
pub struct MetricsAggregator {
    inner: Mutex<Buffers>,
}

struct Buffers {
    latencies: VecDeque<f64>,
    statuses: VecDeque<u16>,
    started_at: Option<Instant>,
    last_record: Option<Instant>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Buffers {
                latencies: VecDeque::with_capacity(SAMPLE_CAPACITY),
                statuses: VecDeque::with_capacity(SAMPLE_CAPACITY),
                started_at: None,
                last_record: None,
            }),
        }
    }

    /// Appends one observation, evicting the oldest pair on overflow.
    pub fn record(&self, outcome: RequestOutcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.push(outcome, Instant::now());
    }

    /// Computes the windowed statistics. Safe to call concurrently with
    /// `record`; the sticky-429 policy may append one synthetic observation.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();

        if inner.statuses.is_empty() {
            return MetricsSnapshot::idle();
        }

        // A trailing 429 with no traffic for over a second means the victim
        // is most likely still limiting us; extend the signal so `status`
        // stays sticky across idle gaps.
        inner.extend_trailing_rate_limit(now);

        let len = inner.statuses.len();
        let window_entries =
            (METRICS_WINDOW.as_secs_f64() / ITERATION_SPACING_SECS).round() as usize;
        let first = len.saturating_sub(window_entries);
        let windowed = (len - first).max(1);

        let mut success = 0usize;
        let mut rate_limited = 0usize;
        for status in inner.statuses.iter().skip(first) {
            match status {
                200 => success += 1,
                429 => rate_limited += 1,
                _ => {}
            }
        }

        let success_rate_pct = 100.0 * success as f64 / windowed as f64;
        let rate_limited_rate_pct = 100.0 * rate_limited as f64 / windowed as f64;
        let failure_rate_pct = 100.0 - success_rate_pct - rate_limited_rate_pct;

        let elapsed = inner
            .started_at
            .map(|start| now.duration_since(start).as_secs_f64())
            .unwrap_or(0.0)
            .min(METRICS_WINDOW.as_secs_f64());
        let requests_per_second = if elapsed > 0.0 {
            windowed as f64 / elapsed
        } else {
            0.0
        };

        // Throughput-adaptive smoothing: faster traffic averages over more
        // of the most recent latency samples.
        let smoothing = ((requests_per_second * 2.0).round().max(1.0) as usize).min(len);
        let avg_response_time_ms =
            inner.latencies.iter().rev().take(smoothing).sum::<f64>() / smoothing as f64;

        let status = if inner.statuses.back() == Some(&429) {
            AttackStatus::RateLimited
        } else {
            AttackStatus::Running
        };

        MetricsSnapshot {
            avg_response_time_ms,
            success_rate_pct,
            rate_limited_rate_pct,
            failure_rate_pct,
            requests_per_second,
            status,
        }
    }

    /// Clears both buffers and the run clocks. Called before a run starts
    /// and after it fully stops so runs never contaminate each other.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.latencies.clear();
        inner.statuses.clear();
        inner.started_at = None;
        inner.last_record = None;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Buffers {
    fn push(&mut self, outcome: RequestOutcome, now: Instant) {
        self.latencies.push_back(outcome.latency_ms);
        self.statuses.push_back(outcome.status_code);
        if self.statuses.len() > SAMPLE_CAPACITY {
            self.latencies.pop_front();
            self.statuses.pop_front();
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.last_record = Some(now);
    }

    fn extend_trailing_rate_limit(&mut self, now: Instant) {
        let Some(last) = self.last_record else { return };
        if self.statuses.back() != Some(&429) {
            return;
        }
        if now.duration_since(last) <= RATE_LIMITED_IDLE_GAP {
            return;
        }
        let latency_ms = self.latencies.back().copied().unwrap_or(0.0);
        self.push(
            RequestOutcome {
                latency_ms,
                status_code: 429,
            },
            now,
        );
    }
}
