//! Single-assignment completion cell.
//!
//! A [`CompletionSignal`] is written at most once. Every read after the write observes the same
//! value; a read before it reports "not complete" without blocking. [`CompletionSignal::wait`]
//! is the blocking (async) variant.
use std::{
    process::ExitStatus,
    sync::{Arc, OnceLock},
};

use qjob_exec::ExecError;
use qjob_model::RunStatus;
use tokio::sync::Notify;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The process ran and exited.
    ///
    /// `code` is `None` when it was ended by a signal.
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// The process never started.
    LaunchFailed(ExecError),
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Exited { code: Some(0), .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Completion::Exited { code, .. } => *code,
            Completion::LaunchFailed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ExecError> {
        match self {
            Completion::LaunchFailed(e) => Some(e),
            Completion::Exited { .. } => None,
        }
    }

    /// Terminal status this completion drives.
    pub fn status(&self) -> RunStatus {
        if self.is_success() {
            RunStatus::Done
        } else {
            RunStatus::Failed
        }
    }

    /// One-line description used in status reports.
    pub fn describe(&self) -> Option<String> {
        match self {
            Completion::Exited { code: Some(0), .. } => None,
            Completion::Exited {
                code: Some(code), ..
            } => Some(format!("exit code: {code}")),
            Completion::Exited {
                signal: Some(sig), ..
            } => Some(format!("terminated by signal {sig}")),
            Completion::Exited { .. } => Some("terminated by signal".to_string()),
            Completion::LaunchFailed(e) => Some(format!("launch failed: {e}")),
        }
    }
}

impl From<ExitStatus> for Completion {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Completion::Exited {
            code: status.code(),
            signal,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    cell: OnceLock<Completion>,
    notify: Notify,
}

/// Cloneable handle to a one-shot completion cell.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<Inner>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the completion.
    ///
    /// Only the first call wins; later calls get their value back in `Err` and change nothing.
    pub fn resolve(&self, completion: Completion) -> Result<(), Completion> {
        self.inner.cell.set(completion)?;
        self.inner.notify.notify_waiters();
        Ok(())
    }

    /// Non-blocking read.
    pub fn get(&self) -> Option<&Completion> {
        self.inner.cell.get()
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.inner.cell.get().is_some()
    }

    /// Wait until the completion is stored.
    pub async fn wait(&self) -> Completion {
        loop {
            // Register before checking so a resolve between the two is not missed.
            let notified = self.inner.notify.notified();
            if let Some(c) = self.inner.cell.get() {
                return c.clone();
            }
            notified.await;
        }
    }
}
