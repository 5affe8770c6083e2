//! # Work Queue Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fallback worker count when the CPU count cannot be detected.
pub const FALLBACK_WORKER_THREADS: usize = 4;

/// Tuning knobs for a [`WorkQueue`](crate::WorkQueue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkQueueConfig {
    /// Maximum number of requests executing at the same time.
    pub worker_threads: usize,

    /// Time budget for one [`ResponsePump::process_responses`](crate::ResponsePump::process_responses)
    /// call, in milliseconds. Zero means "drain everything".
    pub response_time_limit_ms: u64,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        let worker_threads = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(FALLBACK_WORKER_THREADS);
        Self {
            worker_threads,
            response_time_limit_ms: 10,
        }
    }
}

impl WorkQueueConfig {
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_response_time_limit(mut self, limit: Duration) -> Self {
        self.response_time_limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The response budget, or `None` when unlimited.
    pub fn response_time_limit(&self) -> Option<Duration> {
        (self.response_time_limit_ms > 0).then(|| Duration::from_millis(self.response_time_limit_ms))
    }

    /// Worker permits actually handed to the queue. Never zero.
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_unlimited() {
        let config = WorkQueueConfig::default().with_response_time_limit(Duration::ZERO);
        assert_eq!(config.response_time_limit(), None);
    }

    #[test]
    fn test_huge_budget_saturates() {
        let config = WorkQueueConfig::default().with_response_time_limit(Duration::MAX);
        assert_eq!(config.response_time_limit_ms, u64::MAX);
    }

    #[test]
    fn test_zero_workers_still_runs_one() {
        let config = WorkQueueConfig::default().with_worker_threads(0);
        assert_eq!(config.effective_worker_threads(), 1);
    }
}
