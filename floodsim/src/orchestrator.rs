use crate::tasks::{sampler_task, snapshot_history, SnapshotHistory};
use crate::worker::{synthetic_source_ip, Worker};
use crate::SharedState;
use floodsim_core::{AttackConfig, AttackMode, ConfigError, MetricsSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Confirmation returned by a successful start.
#[derive(Clone, Debug)]
pub struct StartedRun {
    pub mode: AttackMode,
    pub thread_count: usize,
    pub target_url: String,
}

struct RunState {
    phase: RunPhase,
    workers: Vec<JoinHandle<()>>,
    sampler: Option<JoinHandle<()>>,
}

/// Owns the worker pool and the shared running flag. At most one run is
/// ever active: starting while running forces a full stop-and-join first.
pub struct AttackOrchestrator {
    shared: SharedState,
    running: Arc<AtomicBool>,
    base_url: String,
    client: reqwest::Client,
    history: SnapshotHistory,
    // Serializes every phase transition, including the joins inside stop.
    run: tokio::sync::Mutex<RunState>,
}

impl AttackOrchestrator {
    /// `base_url` is scheme://host:port of the target service; the
    /// configured endpoint path is appended per run.
    pub fn new(shared: SharedState, base_url: impl Into<String>) -> Self {
        Self {
            shared,
            running: Arc::new(AtomicBool::new(false)),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            history: snapshot_history(),
            run: tokio::sync::Mutex::new(RunState {
                phase: RunPhase::Idle,
                workers: Vec::new(),
                sampler: None,
            }),
        }
    }

    /// Validates the config, tears down any prior run, and spawns the new
    /// worker pool plus the per-second snapshot sampler. Non-blocking:
    /// workers run until an external `stop`.
    #[instrument(skip_all, fields(mode = %config.mode, threads = config.thread_count))]
    pub async fn configure_and_start(
        &self,
        config: AttackConfig,
    ) -> Result<StartedRun, ConfigError> {
        config.validate()?;

        let mut run = self.run.lock().await;
        if run.phase != RunPhase::Idle {
            // Overlapping runs are a correctness violation; recover by
            // forcing the stop rather than reporting an error.
            warn!("start requested while a run is active, stopping it first");
            self.halt(&mut run).await;
        }
        run.phase = RunPhase::Starting;

        self.shared.metrics.reset();
        self.history.lock().unwrap().clear();
        self.running.store(true, Ordering::Relaxed);

        let target_url = format!("{}{}", self.base_url, config.target_endpoint);
        for id in 0..config.thread_count {
            let node = match config.mode {
                AttackMode::Single => None,
                AttackMode::Distributed => {
                    let mut node = uuid::Uuid::new_v4().as_simple().to_string();
                    node.truncate(8);
                    Some(node)
                }
            };
            let worker = Worker {
                id,
                node,
                source_ip: synthetic_source_ip(),
                target_url: target_url.clone(),
                blacklist_feedback: config.enable_blacklist_feedback,
                client: self.client.clone(),
                running: Arc::clone(&self.running),
                shared: self.shared.clone(),
            };
            run.workers.push(tokio::spawn(worker.run()));
        }
        run.sampler = Some(tokio::spawn(sampler_task(
            Arc::clone(&self.shared.metrics),
            Arc::clone(&self.running),
            Arc::clone(&self.history),
        )));

        info!("attack started against {target_url}");
        self.shared.events.info(format!(
            "attack started: mode={}, threads={}, target={}, blacklist_feedback={}",
            config.mode, config.thread_count, target_url, config.enable_blacklist_feedback
        ));

        run.phase = RunPhase::Running;
        Ok(StartedRun {
            mode: config.mode,
            thread_count: config.thread_count,
            target_url,
        })
    }

    /// Cooperative stop: clears the flag, joins every worker (bounded by
    /// one in-flight request plus up to 1s of backoff), emits the summary
    /// event, and resets the aggregator. No-op when already idle.
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        if run.phase == RunPhase::Idle {
            return;
        }
        self.halt(&mut run).await;
    }

    async fn halt(&self, run: &mut RunState) {
        run.phase = RunPhase::Stopping;
        self.running.store(false, Ordering::Relaxed);

        for handle in run.workers.drain(..) {
            if let Err(err) = handle.await {
                error!("worker task panicked: {err}");
            }
        }
        if let Some(sampler) = run.sampler.take() {
            let _ = sampler.await;
        }

        let summary = self.shared.metrics.snapshot();
        info!("attack stopped: {summary}");
        self.shared
            .events
            .info(format!("attack stopped: {summary}"));
        self.shared.metrics.reset();

        run.phase = RunPhase::Idle;
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn phase(&self) -> RunPhase {
        self.run.lock().await.phase
    }

    pub async fn worker_count(&self) -> usize {
        self.run.lock().await.workers.len()
    }

    /// The sampler's bounded per-second history for the current run.
    pub fn snapshot_history(&self) -> Vec<MetricsSnapshot> {
        self.history.lock().unwrap().iter().cloned().collect()
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }
}
