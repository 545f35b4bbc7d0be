use crate::SharedState;
use floodsim_core::{RequestOutcome, SYNTHETIC_FAILURE_LATENCY_MS};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
#[allow(unused_imports)]
use tracing::{debug, error, trace, warn};

const ITERATION_PAUSE: Duration = Duration::from_millis(100);
const TRANSPORT_FAILURE_PAUSE: Duration = Duration::from_millis(500);

/// One simulated client: a serial stream of GETs against the target,
/// carrying a synthetic source IP assigned once at creation.
pub(crate) struct Worker {
    pub id: usize,
    /// Log-attribution label in distributed mode; behaviorally inert.
    pub node: Option<String>,
    pub source_ip: String,
    pub target_url: String,
    pub blacklist_feedback: bool,
    pub client: reqwest::Client,
    pub running: Arc<AtomicBool>,
    pub shared: SharedState,
}

/// Random address in 192.168.1.1-255. Collisions across workers are
/// accepted noise, not a defect.
pub(crate) fn synthetic_source_ip() -> String {
    format!("192.168.1.{}", rand::thread_rng().gen_range(1..=255))
}

/// Linear backoff after consecutive 429s, capped at one second.
pub(crate) fn backoff_delay(consecutive_429: u32) -> Duration {
    Duration::from_secs_f64((f64::from(consecutive_429) * 0.1).min(1.0))
}

impl Worker {
    fn label(&self) -> String {
        match &self.node {
            Some(node) => format!("worker {} (node {})", self.id, node),
            None => format!("worker {}", self.id),
        }
    }

    /// Runs until the shared flag clears. A single failed request never
    /// terminates the loop; transport failures become synthetic outcomes.
    pub async fn run(self) {
        let label = self.label();
        let mut consecutive_429 = 0u32;
        let mut reported_blocked = false;

        while self.running.load(Ordering::Relaxed) {
            if self.blacklist_feedback
                && !reported_blocked
                && self.shared.blacklist.contains(&self.source_ip)
            {
                // The block is an external signal, not a stop: warn once and
                // keep probing around it on later iterations.
                warn!("{label}: source {} is blacklisted", self.source_ip);
                self.shared.events.warning(format!(
                    "{label}: {} is blacklisted, probing around the block",
                    self.source_ip
                ));
                reported_blocked = true;
                continue;
            }

            let start = Instant::now();
            let response = self
                .client
                .get(&self.target_url)
                .header("X-Forwarded-For", self.source_ip.as_str())
                .send()
                .await;

            match response {
                Ok(response) => {
                    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                    let status_code = response.status().as_u16();
                    self.shared.metrics.record(RequestOutcome {
                        latency_ms,
                        status_code,
                    });
                    trace!("{label}: {status_code} in {latency_ms:.1}ms");

                    if status_code == 429 {
                        consecutive_429 += 1;
                        if self.blacklist_feedback && self.shared.blacklist.add(&self.source_ip) {
                            self.shared.events.info(format!(
                                "defense blacklisted {} after repeated limiting",
                                self.source_ip
                            ));
                        }
                        tokio::time::sleep(backoff_delay(consecutive_429)).await;
                    } else {
                        consecutive_429 = 0;
                        tokio::time::sleep(ITERATION_PAUSE).await;
                    }
                }
                Err(err) => {
                    self.shared.metrics.record(RequestOutcome {
                        latency_ms: SYNTHETIC_FAILURE_LATENCY_MS,
                        status_code: 500,
                    });
                    debug!("{label}: request failed: {err}");
                    self.shared
                        .events
                        .error(format!("{label}: request failed: {err}"));
                    tokio::time::sleep(TRANSPORT_FAILURE_PAUSE).await;
                }
            }
        }
        trace!("{label}: observed stop flag, exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
        assert_eq!(backoff_delay(3), Duration::from_millis(300));
        assert_eq!(backoff_delay(9), Duration::from_millis(900));
    }

    #[test]
    fn backoff_caps_at_one_second() {
        assert_eq!(backoff_delay(10), Duration::from_secs(1));
        assert_eq!(backoff_delay(11), Duration::from_secs(1));
        assert_eq!(backoff_delay(1_000), Duration::from_secs(1));
    }

    #[test]
    fn synthetic_ips_stay_in_range() {
        for _ in 0..200 {
            let ip = synthetic_source_ip();
            let octet: u16 = ip.strip_prefix("192.168.1.").unwrap().parse().unwrap();
            assert!((1..=255).contains(&octet));
        }
    }
}
