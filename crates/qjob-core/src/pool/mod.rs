//! Shared worker pool for job background tasks.
use std::{future::Future, sync::Arc};

use tokio::{
    runtime::Handle,
    sync::{OwnedSemaphorePermit, Semaphore},
    task::JoinHandle,
};
use tracing::trace;

use crate::{config::PoolConfig, error::CoreError};

/// Runtime handle plus an optional bound on concurrent launches.
///
/// Cloning is cheap; all clones share the same bound.
#[derive(Clone, Debug)]
pub struct JobPool {
    handle: Handle,
    permits: Option<Arc<Semaphore>>,
}

impl JobPool {
    /// Pool on the runtime the caller is running in.
    pub fn current() -> Result<Self, CoreError> {
        let handle = Handle::try_current().map_err(|e| CoreError::NoRuntime(e.to_string()))?;
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            permits: None,
        }
    }

    pub fn with_config(mut self, cfg: &PoolConfig) -> Result<Self, CoreError> {
        cfg.validate()?;
        self.permits = cfg
            .max_concurrent_launches
            .map(|max| Arc::new(Semaphore::new(max)));
        Ok(self)
    }

    /// Launch slots not in use, or `None` when unbounded.
    pub fn available_permits(&self) -> Option<usize> {
        self.permits.as_ref().map(|s| s.available_permits())
    }

    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }

    /// Wait for a launch slot. Always succeeds immediately on an unbounded pool.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let sem = self.permits.as_ref()?;
        trace!(target: "qjob.core.pool", available = sem.available_permits(), "acquire launch slot");
        // The semaphore is never closed.
        Arc::clone(sem).acquire_owned().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn current_without_runtime_fails() {
        let err = JobPool::current().unwrap_err();
        assert!(matches!(err, CoreError::NoRuntime(_)));
    }

    #[tokio::test]
    async fn unbounded_pool_never_waits() {
        let pool = JobPool::current().unwrap();
        assert_eq!(pool.available_permits(), None);
        assert!(pool.acquire().await.is_none());
    }

    #[tokio::test]
    async fn zero_bound_is_rejected() {
        let cfg = PoolConfig::default().with_max_concurrent_launches(0);
        assert!(JobPool::current().unwrap().with_config(&cfg).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bounded_pool_limits_concurrent_holders() {
        let cfg = PoolConfig::default().with_max_concurrent_launches(1);
        let pool = JobPool::current().unwrap().with_config(&cfg).unwrap();

        let first = pool.acquire().await;
        assert!(first.is_some());
        assert_eq!(pool.available_permits(), Some(0));

        let waiter = {
            let pool = pool.clone();
            pool.clone().spawn(async move { pool.acquire().await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let got = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(got);
    }
}
