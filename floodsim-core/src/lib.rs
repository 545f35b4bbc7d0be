mod blacklist;
mod config;
mod constants;
mod event_log;
mod metrics;

pub use blacklist::*;
pub use config::*;
pub use constants::*;
pub use event_log::*;
pub use metrics::*;
