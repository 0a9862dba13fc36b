use thiserror::Error;

/// Failures raised while preparing or running a process.
///
/// `Io` may surface after the process started; every other variant means it never ran.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("a process is already running under this controller")]
    AlreadyRunning,
    #[error("missing program")]
    MissingProgram,
    #[error("spawn {program} failed: {reason}")]
    Spawn { program: String, reason: String },
    #[error("cannot open {path} for output: {reason}")]
    Redirect { path: String, reason: String },
    #[error("io error: {0}")]
    Io(String),
    #[error("cancelled before launch")]
    Cancelled,
}

impl ExecError {
    /// Returns `true` if the command could not be started at all.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            ExecError::MissingProgram | ExecError::Spawn { .. } | ExecError::Redirect { .. }
        )
    }

    /// Returns `true` if the launch was abandoned because a stop was requested first.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}
