//! Asynchronous execution of one job.
//!
//! An [`AsyncJobRunner`] moves through `Pending -> Running -> {Done, Failed}`. [`start`] is
//! synchronous: it publishes `Running`, the start time and the execution host before returning,
//! then hands the launch to a background task on the shared [`JobPool`]. The background task
//! resolves the runner's [`CompletionSignal`] exactly once and applies the terminal status.
//!
//! Callers poll with [`query_status`]. Each poll either re-publishes the terminal status (and
//! returns `true`) or refreshes the liveness heartbeat and re-asserts the current status (and
//! returns `false`), so an external poller never mistakes a quiet job for a dead one.
//!
//! [`start`]: AsyncJobRunner::start
//! [`query_status`]: AsyncJobRunner::query_status
use std::{
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::{Duration, SystemTime},
};

use qjob_exec::{
    ExecError, LaunchSpec, NativeSpec, NativeSpecBuilder, ProcessController, StopOutcome,
    launch_spec,
};
use qjob_model::{JobDescription, JobId, RunInfo, RunStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::RunnerConfig,
    error::CoreError,
    pool::JobPool,
    signal::{Completion, CompletionSignal},
    state::{StatusReport, StatusSink},
    system::exec_host,
};

struct RunState {
    status: RunStatus,
    info: RunInfo,
    last_alive_at: Option<SystemTime>,
}

struct RunnerInner {
    id: JobId,
    job: Arc<JobDescription>,
    config: RunnerConfig,
    builder: NativeSpecBuilder,
    native: OnceLock<NativeSpec>,
    controller: ProcessController,
    signal: CompletionSignal,
    stop: CancellationToken,
    state: Mutex<RunState>,
    sink: Arc<dyn StatusSink>,
    pool: JobPool,
}

/// Runs one job on a background task and reports its status.
///
/// Cloning yields another handle to the same run.
#[derive(Clone)]
pub struct AsyncJobRunner {
    inner: Arc<RunnerInner>,
}

impl AsyncJobRunner {
    pub fn new(
        job: impl Into<Arc<JobDescription>>,
        config: &RunnerConfig,
        pool: JobPool,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self::with_id(JobId::generate(), job, config, pool, sink)
    }

    pub fn with_id(
        id: JobId,
        job: impl Into<Arc<JobDescription>>,
        config: &RunnerConfig,
        pool: JobPool,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                id,
                job: job.into(),
                config: config.clone(),
                builder: config.spec_builder(),
                native: OnceLock::new(),
                controller: ProcessController::new(),
                signal: CompletionSignal::new(),
                stop: CancellationToken::new(),
                state: Mutex::new(RunState {
                    status: RunStatus::Pending,
                    info: RunInfo::default(),
                    last_alive_at: None,
                }),
                sink,
                pool,
            }),
        }
    }

    /// Start the job.
    ///
    /// Returns once the runner is `Running`; the process itself is launched in the background.
    /// Launch failures are not returned here: they resolve the completion signal and drive
    /// the runner to `Failed`. An invalid job description is rejected and leaves the runner
    /// `Pending`.
    pub fn start(&self) -> Result<(), CoreError> {
        let inner = &self.inner;
        inner.job.validate()?;

        let (launch, report) = {
            let mut state = inner.lock_state();
            if state.status != RunStatus::Pending {
                return Err(CoreError::AlreadyStarted {
                    job: inner.id.clone(),
                    status: state.status,
                });
            }

            let native = inner.native.get_or_init(|| inner.builder.build(&inner.job));
            let launch = launch_spec(
                &inner.job,
                native,
                &inner.config.submit_mode,
                inner.config.debug_echo,
            );

            let now = SystemTime::now();
            state.status = RunStatus::Running;
            state.info.start_time = Some(now);
            state.info.exec_hosts = vec![exec_host().to_string()];
            state.last_alive_at = Some(now);

            (launch, inner.report_for(&state))
        };
        inner.sink.report(&report);

        info!(
            target: "qjob.core.runner",
            job = %inner.id,
            name = %inner.job.sanitized_name(),
            mode = inner.config.submit_mode.as_str(),
            command = %launch.command_line(),
            "job started"
        );

        let task = Arc::clone(inner);
        inner.pool.spawn(async move {
            let completion = task.execute(&launch).await;
            task.finish(completion);
        });
        Ok(())
    }

    /// Non-blocking status poll.
    ///
    /// Returns `true` once the job has completed. Repeated calls after completion re-publish
    /// the same terminal status and never move the completion time.
    pub fn query_status(&self) -> bool {
        let inner = &self.inner;
        if let Some(report) = inner.apply_terminal() {
            inner.sink.report(&report);
            return true;
        }

        let report = {
            let mut state = inner.lock_state();
            state.last_alive_at = Some(SystemTime::now());
            inner.report_for(&state)
        };
        trace!(target: "qjob.core.runner", job = %inner.id, status = %report.status, "heartbeat");
        inner.sink.report(&report);
        false
    }

    /// Ask the job to stop. Never fails and does not wait for the process to exit.
    ///
    /// A stop before the process is launched (including during the start delay) abandons the
    /// launch; the run then ends `Failed` with [`ExecError::Cancelled`].
    pub fn request_stop(&self) -> StopOutcome {
        let inner = &self.inner;
        // Must precede the cancel; the task reaps and clears the slot once the token fires.
        let outcome = inner.controller.terminate();
        inner.stop.cancel();
        info!(target: "qjob.core.runner", job = %inner.id, ?outcome, "stop requested");
        outcome
    }

    /// Wait for completion, then publish it.
    ///
    /// Never returns for a runner that was not started.
    pub async fn wait(&self) -> Completion {
        let completion = self.inner.signal.wait().await;
        self.query_status();
        completion
    }

    pub fn id(&self) -> &JobId {
        &self.inner.id
    }

    pub fn job(&self) -> &JobDescription {
        &self.inner.job
    }

    pub fn status(&self) -> RunStatus {
        self.inner.lock_state().status
    }

    pub fn run_info(&self) -> RunInfo {
        self.inner.lock_state().info.clone()
    }

    /// Scheduler arguments built by [`start`](Self::start).
    pub fn native_spec(&self) -> Option<&NativeSpec> {
        self.inner.native.get()
    }

    /// Non-blocking read of the completion signal.
    pub fn completion(&self) -> Option<&Completion> {
        self.inner.signal.get()
    }

    /// Last time a poll observed the job as not yet complete.
    pub fn last_observed_alive_at(&self) -> Option<SystemTime> {
        self.inner.lock_state().last_alive_at
    }

    /// OS pid of the live process, if one is running.
    pub fn pid(&self) -> Option<u32> {
        self.inner.controller.pid()
    }
}

impl RunnerInner {
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_for(&self, state: &RunState) -> StatusReport {
        let completion = self.signal.get();
        StatusReport {
            job: self.id.clone(),
            status: state.status,
            info: state.info.clone(),
            exit_code: completion.and_then(Completion::exit_code),
            error: completion.and_then(Completion::describe),
        }
    }

    async fn execute(&self, launch: &LaunchSpec) -> Completion {
        if let Some(delay) = self.job.start_delay_secs.filter(|d| *d > 0) {
            debug!(target: "qjob.core.runner", job = %self.id, delay, "delaying launch");
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
                _ = self.stop.cancelled() => return Completion::LaunchFailed(ExecError::Cancelled),
            }
        }

        let _permit = tokio::select! {
            permit = self.pool.acquire() => permit,
            _ = self.stop.cancelled() => return Completion::LaunchFailed(ExecError::Cancelled),
        };
        if self.stop.is_cancelled() {
            return Completion::LaunchFailed(ExecError::Cancelled);
        }

        let launch_fut = self.controller.launch(launch);
        tokio::pin!(launch_fut);

        // The launch is polled first so its process slot exists before a stop is forwarded.
        let result = tokio::select! {
            biased;
            result = &mut launch_fut => result,
            _ = self.stop.cancelled() => {
                self.controller.terminate();
                launch_fut.await
            }
        };

        match result {
            Ok(status) => Completion::from(status),
            Err(e) => Completion::LaunchFailed(e),
        }
    }

    fn finish(&self, completion: Completion) {
        if let Err(rejected) = self.signal.resolve(completion) {
            debug!(target: "qjob.core.runner", job = %self.id, ?rejected, "completion already set");
        }
        let Some(report) = self.apply_terminal() else {
            return;
        };
        self.sink.report(&report);

        match report.status {
            RunStatus::Done => {
                info!(target: "qjob.core.runner", job = %self.id, "job done");
            }
            _ => {
                warn!(
                    target: "qjob.core.runner",
                    job = %self.id,
                    code = ?report.exit_code,
                    reason = report.error.as_deref().unwrap_or("unknown"),
                    "job failed"
                );
            }
        }
    }

    /// Apply the resolved completion to the run state.
    ///
    /// Returns `None` while unresolved. The completion time is recorded on the first call only.
    fn apply_terminal(&self) -> Option<StatusReport> {
        let completion = self.signal.get()?;
        let mut state = self.lock_state();
        let target = completion.status();
        if state.status != target {
            if !state.status.can_transition_to(target) {
                warn!(
                    target: "qjob.core.runner",
                    job = %self.id,
                    from = %state.status,
                    to = %target,
                    "unexpected status transition"
                );
            }
            if !state.status.is_terminal() {
                state.status = target;
            }
        }
        if state.info.done_time.is_none() {
            state.info.done_time = Some(SystemTime::now());
        }
        Some(self.report_for(&state))
    }
}
