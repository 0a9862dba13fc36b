mod config;
mod error;
mod format;
mod level;
mod log;

pub use config::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, LoggerConfig};
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use level::LoggerLevel;

/// Install the global `tracing` subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when a global subscriber is already set.
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => log::text(cfg),
        LoggerFormat::Json => log::json(cfg),
        LoggerFormat::Journald => log::journald(cfg),
    }
}
