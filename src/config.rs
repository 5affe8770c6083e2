//! # Configuration
//!
//! [`QueueConfig`] is plain serde data so a host can embed it in its own config file.
//! [`QueueConfig::from_env`] offers quick overrides for tools and demos:
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `RESOURCE_QUEUE_THREADING` | `sync`, `background`, `split` | `background` |
//! | `RESOURCE_QUEUE_WORKERS` | positive integer | CPU count |
//! | `RESOURCE_QUEUE_RESPONSE_BUDGET_MS` | integer, `0` = unlimited | `10` |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;
use work_queue::WorkQueueConfig;

pub const THREADING_ENV: &str = "RESOURCE_QUEUE_THREADING";
pub const WORKERS_ENV: &str = "RESOURCE_QUEUE_WORKERS";
pub const RESPONSE_BUDGET_ENV: &str = "RESOURCE_QUEUE_RESPONSE_BUDGET_MS";

/// Where store operations run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadingMode {
    /// No worker threads: every operation runs on the calling thread before returning.
    Synchronous,
    /// Operations run entirely on worker threads.
    #[default]
    Background,
    /// Workers only prepare; the final load of `LoadResource` and `LoadGroup` runs on the
    /// pump thread. For stores whose load step needs a single-owner context.
    SplitPhase,
}

impl FromStr for ThreadingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ThreadingMode::Synchronous),
            "background" | "threaded" => Ok(ThreadingMode::Background),
            "split" | "split_phase" | "split-phase" => Ok(ThreadingMode::SplitPhase),
            other => Err(format!("unknown threading mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub threading_mode: ThreadingMode,
    pub work_queue: WorkQueueConfig,
}

impl QueueConfig {
    pub fn with_threading_mode(mut self, mode: ThreadingMode) -> Self {
        self.threading_mode = mode;
        self
    }

    pub fn with_work_queue(mut self, work_queue: WorkQueueConfig) -> Self {
        self.work_queue = work_queue;
        self
    }

    /// Defaults overridden by the `RESOURCE_QUEUE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(mode) = parse_var(&lookup, THREADING_ENV) {
            config.threading_mode = mode;
        }
        if let Some(workers) = parse_var::<usize>(&lookup, WORKERS_ENV) {
            config.work_queue.worker_threads = workers;
        }
        if let Some(budget) = parse_var(&lookup, RESPONSE_BUDGET_ENV) {
            config.work_queue.response_time_limit_ms = budget;
        }
        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring invalid setting");
            None
        }
    }
}
