pub mod config;
pub use config::{PoolConfig, RunnerConfig};

mod error;
pub use error::CoreError;

pub mod pool;
pub use pool::JobPool;

pub mod runner;
pub use runner::AsyncJobRunner;

pub mod signal;
pub use signal::{Completion, CompletionSignal};

pub mod state;
pub use state::{JobEntry, NoopSink, StatusBoard, StatusReport, StatusSink};

mod system;
pub use system::exec_host;

pub mod tracker;
pub use tracker::RunnerSet;
