use thiserror::Error;

use qjob_model::{JobId, ModelError, RunStatus};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("job {job} was already started (status: {status})")]
    AlreadyStarted { job: JobId, status: RunStatus },

    #[error("no async runtime available: {0}")]
    NoRuntime(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid job: {0}")]
    Model(#[from] ModelError),
}
