use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError};

pub(crate) fn text(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let layer = fmt::layer()
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_timer());

    init_with(tracing_subscriber::registry().with(cfg.level.filter()?).with(layer))
}

pub(crate) fn json(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_current_span(false)
        .with_timer(local_timer());

    init_with(tracing_subscriber::registry().with(cfg.level.filter()?).with(layer))
}

pub(crate) fn journald(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    journald_with(cfg.level.filter()?)
}

/// RFC 3339 timestamps in the host's local offset, UTC when it cannot be determined.
fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let msg = e.to_string();
        if msg.contains("SetGlobalDefaultError") || msg.contains("global default") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::InitializationFailed(msg)
        }
    })
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald_with(filter: EnvFilter) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier("qjob".to_string());
    init_with(tracing_subscriber::registry().with(filter).with(layer))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald_with(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
