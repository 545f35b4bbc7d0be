use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Configuration for one attack run. Immutable once the run starts.
///
/// The serde aliases accept the payload shape of the original control UI
/// (`NUM_THREADS`, `RATE_LIMIT`, ...) alongside the snake_case names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttackConfig {
    #[serde(alias = "NUM_THREADS", default = "default_thread_count")]
    pub thread_count: usize,

    /// Requests-per-minute limit the victim is believed to enforce.
    /// Informational only; workers do not throttle to it.
    #[serde(alias = "RATE_LIMIT", default = "default_rate_limit")]
    pub rate_limit_hint: u32,

    #[serde(alias = "ATTACK_MODE", default)]
    pub mode: AttackMode,

    #[serde(alias = "TARGET_ENDPOINT", default = "default_target_endpoint")]
    pub target_endpoint: String,

    #[serde(alias = "IS_BLACKLISTING", default)]
    pub enable_blacklist_feedback: bool,
}

fn default_thread_count() -> usize {
    10
}

fn default_rate_limit() -> u32 {
    5
}

fn default_target_endpoint() -> String {
    "/limited".to_string()
}

impl AttackConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_count == 0 {
            return Err(ConfigError::InvalidThreadCount);
        }
        if self.rate_limit_hint == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }
        if !self.target_endpoint.starts_with('/') {
            return Err(ConfigError::InvalidTargetEndpoint(
                self.target_endpoint.clone(),
            ));
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackMode {
    #[default]
    Single,
    Distributed,
}

impl fmt::Display for AttackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackMode::Single => write!(f, "single"),
            AttackMode::Distributed => write!(f, "distributed"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    #[error("rate limit must be at least 1 request per minute")]
    InvalidRateLimit,

    #[error("target endpoint must be an absolute path, got {0:?}")]
    InvalidTargetEndpoint(String),
}
