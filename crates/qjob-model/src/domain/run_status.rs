use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single job run.
///
/// ```text
/// Pending ──► Running ──┬──► Done
///                       └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    /// Job is described but not started yet.
    Pending,
    /// Job has been started and its process has not been observed to exit.
    Running,
    /// Process exited with code 0.
    Done,
    /// Process could not be launched or exited non-zero.
    Failed,
}

impl RunStatus {
    /// Returns `true` for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }

    /// Returns `true` if the job is still pending or running.
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Pending | RunStatus::Running)
    }

    /// Whether `self -> next` is a legal forward edge.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Done)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
