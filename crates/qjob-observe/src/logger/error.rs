use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format '{0}' (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("journald output is unavailable in this build")]
    JournaldNotSupported,
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger setup failed: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter '{0}'")]
    InvalidLogLevel(String),
}
