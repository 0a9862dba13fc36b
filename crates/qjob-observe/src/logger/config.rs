use std::io::IsTerminal;

use crate::logger::{error::LoggerError, format::LoggerFormat, level::LoggerLevel};

pub const ENV_LOG_LEVEL: &str = "QJOB_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "QJOB_LOG_FORMAT";

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: cfg!(test) || std::io::stdout().is_terminal(),
        }
    }
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LoggerLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_targets(mut self, on: bool) -> Self {
        self.with_targets = on;
        self
    }

    pub fn with_color(mut self, on: bool) -> Self {
        self.use_color = on;
        self
    }

    /// Defaults overridden by `QJOB_LOG_LEVEL` and `QJOB_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            cfg.level = level.parse()?;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            cfg.format = format.parse()?;
            if cfg.format == LoggerFormat::Json {
                cfg.use_color = false;
            }
        }
        Ok(cfg)
    }
}
