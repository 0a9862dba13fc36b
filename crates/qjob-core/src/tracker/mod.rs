use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use qjob_exec::StopOutcome;
use qjob_model::JobId;
use tracing::{debug, info};

use crate::runner::AsyncJobRunner;

/// Registry of the runners owned by one controller.
///
/// Used by shutdown hooks to stop every live job, and by pollers to query all of them at once.
#[derive(Clone, Default)]
pub struct RunnerSet {
    inner: Arc<RwLock<HashMap<JobId, AsyncJobRunner>>>,
}

impl RunnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runner; replaces any runner already registered under the same id.
    pub fn insert(&self, runner: AsyncJobRunner) -> Option<AsyncJobRunner> {
        let mut runners = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        runners.insert(runner.id().clone(), runner)
    }

    pub fn get(&self, id: &JobId) -> Option<AsyncJobRunner> {
        let runners = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        runners.get(id).cloned()
    }

    pub fn remove(&self, id: &JobId) -> Option<AsyncJobRunner> {
        let mut runners = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        runners.remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<AsyncJobRunner> {
        let runners = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        runners.values().cloned().collect()
    }

    /// Poll every runner; returns the ids of completed jobs.
    pub fn query_all(&self) -> Vec<JobId> {
        let mut done: Vec<JobId> = self
            .snapshot()
            .into_iter()
            .filter(|r| r.query_status())
            .map(|r| r.id().clone())
            .collect();
        done.sort();
        done
    }

    /// Ask every runner to stop. Returns how many had a live process.
    pub fn stop_all(&self) -> usize {
        let runners = self.snapshot();
        let mut live = 0;
        for runner in &runners {
            if let StopOutcome::Requested { .. } = runner.request_stop() {
                live += 1;
            }
        }
        info!(target: "qjob.core.tracker", total = runners.len(), live, "stop requested for all jobs");
        live
    }

    /// Remove completed runners and return them.
    pub fn reap_finished(&self) -> Vec<AsyncJobRunner> {
        let mut runners = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let done: Vec<JobId> = runners
            .iter()
            .filter(|(_, r)| r.completion().is_some())
            .map(|(id, _)| id.clone())
            .collect();

        let reaped: Vec<AsyncJobRunner> = done
            .iter()
            .filter_map(|id| runners.remove(id))
            .collect();
        if !reaped.is_empty() {
            debug!(target: "qjob.core.tracker", count = reaped.len(), "reaped finished runners");
        }
        reaped
    }
}
