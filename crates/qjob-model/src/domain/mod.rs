mod kv;
pub use kv::KeyValue;

mod job_env;
pub use job_env::JobEnv;

mod job_id;
pub use job_id::JobId;

mod job_name;
pub use job_name::{JOB_NAME_FORBIDDEN, sanitize_job_name};

mod priority;
pub use priority::PriorityBounds;

mod run_info;
pub use run_info::RunInfo;

mod run_status;
pub use run_status::RunStatus;

/// Pre-start delay in whole seconds.
pub type DelaySecs = u64;
