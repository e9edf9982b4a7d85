use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tessera_transport::Address;

/// Counters gathered by the coordinator over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub tasks_total: usize,
    pub workers: usize,
    pub dispatched: usize,
    pub collected: usize,
    /// Results received by the targeted wait before a worker was retired.
    pub collected_in_final_drain: usize,
    /// Tasks assigned to each worker rank.
    pub per_worker: BTreeMap<u32, usize>,
    pub elapsed_ms: u64,
}

impl RunStats {
    pub fn new(tasks_total: usize, workers: usize) -> Self {
        Self {
            tasks_total,
            workers,
            ..Self::default()
        }
    }

    pub(crate) fn record_dispatch(&mut self, worker: Address) {
        self.dispatched += 1;
        *self.per_worker.entry(worker.rank()).or_default() += 1;
    }

    pub(crate) fn record_collect(&mut self, final_drain: bool) {
        self.collected += 1;
        if final_drain {
            self.collected_in_final_drain += 1;
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
