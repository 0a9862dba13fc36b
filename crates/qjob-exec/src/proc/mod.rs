//! Ownership of a single external process.
//!
//! [`ProcessController`] owns at most one live process. [`ProcessController::launch`] spawns it
//! and waits for its exit; [`ProcessController::terminate`] may be called from any thread and
//! asks the waiting task to kill it.
//!
//! The live-process slot is guarded by a mutex that is only held to install, inspect or clear
//! the slot, never across the wait. Each launch carries a generation number so a finished launch
//! never clears the slot of a newer one.
use std::{
    path::PathBuf,
    process::ExitStatus,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::ExecError,
    util::{cmd_program, kill_graceful},
};

mod output;
pub use output::OutputTarget;

/// Fully resolved command line for one launch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub output: OutputTarget,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>, output: OutputTarget) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            output,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Program followed by its arguments, for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Result of a best-effort stop request.
///
/// Stopping never fails from the caller's point of view: a kill that cannot be delivered is
/// logged by the task waiting on the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// A live process was told to stop.
    Requested { pid: Option<u32> },
    /// No process was live.
    Idle,
}

struct LiveProcess {
    generation: u64,
    pid: Option<u32>,
    cancel: CancellationToken,
}

/// Owner of at most one running process.
#[derive(Default)]
pub struct ProcessController {
    slot: Mutex<Option<LiveProcess>>,
    generation: AtomicU64,
}

impl ProcessController {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<LiveProcess>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` while a launched process has not been reaped.
    pub fn is_running(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// OS pid of the live process, if any.
    pub fn pid(&self) -> Option<u32> {
        self.lock_slot().as_ref().and_then(|live| live.pid)
    }

    /// Spawn the process and wait for it to exit.
    ///
    /// Fails with a launch error if the program cannot be started or its output files cannot be
    /// opened, and with [`ExecError::AlreadyRunning`] if this controller already owns a process.
    pub async fn launch(&self, spec: &LaunchSpec) -> Result<ExitStatus, ExecError> {
        if spec.program.as_os_str().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let cancel = CancellationToken::new();
        let generation = {
            let mut slot = self.lock_slot();
            if slot.is_some() {
                return Err(ExecError::AlreadyRunning);
            }
            let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
            *slot = Some(LiveProcess {
                generation,
                pid: None,
                cancel: cancel.clone(),
            });
            generation
        };
        let _release = SlotRelease {
            controller: self,
            generation,
        };

        let mut cmd = cmd_program(&spec.program, &spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        cmd.kill_on_drop(true);
        let redirect = output::attach(&mut cmd, &spec.output).await?;

        trace!(target: "qjob.exec.proc", command = %spec.command_line(), "spawn");
        let mut child = cmd.spawn().map_err(|e| ExecError::Spawn {
            program: spec.program.display().to_string(),
            reason: e.to_string(),
        })?;

        let pid = child.id();
        if let Some(live) = self.lock_slot().as_mut()
            && live.generation == generation
        {
            live.pid = pid;
        }
        debug!(target: "qjob.exec.proc", ?pid, "process started");

        let pumps = redirect.start(&mut child);
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                debug!(target: "qjob.exec.proc", ?pid, "stop requested; killing child");
                if let Err(e) = kill_graceful(&mut child).await {
                    warn!(target: "qjob.exec.proc", ?pid, error = %e, "failed to kill process");
                }
                child.wait().await?
            }
        };
        pumps.finish().await;

        debug!(target: "qjob.exec.proc", ?pid, code = ?status.code(), "process exited");
        Ok(status)
    }

    /// Ask the live process, if any, to stop. Never blocks and never fails.
    pub fn terminate(&self) -> StopOutcome {
        let slot = self.lock_slot();
        match slot.as_ref() {
            Some(live) => {
                debug!(target: "qjob.exec.proc", pid = ?live.pid, "terminate requested");
                live.cancel.cancel();
                StopOutcome::Requested { pid: live.pid }
            }
            None => {
                trace!(target: "qjob.exec.proc", "terminate requested with no live process");
                StopOutcome::Idle
            }
        }
    }
}

/// Clears the slot when a launch ends, however it ends.
struct SlotRelease<'a> {
    controller: &'a ProcessController,
    generation: u64,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slot = self.controller.lock_slot();
        if slot
            .as_ref()
            .is_some_and(|live| live.generation == self.generation)
        {
            *slot = None;
        }
    }
}
