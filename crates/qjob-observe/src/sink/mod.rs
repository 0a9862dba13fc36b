use qjob_core::{StatusReport, StatusSink};
use qjob_model::RunStatus;
use tracing::{debug, info, trace, warn};

/// [`StatusSink`] that writes every report to the log.
///
/// Heartbeats of running jobs are logged at `trace`; terminal reports at `info` (done) or `warn`
/// (failed).
#[derive(Debug, Default, Clone, Copy)]
pub struct JournalSink;

impl JournalSink {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
pub fn message_for(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "job registered, not started",
        RunStatus::Running => "job running",
        RunStatus::Done => "job finished successfully",
        RunStatus::Failed => "job failed",
    }
}

impl StatusSink for JournalSink {
    fn report(&self, r: &StatusReport) {
        let msg = message_for(r.status);
        let host = r.info.exec_hosts.first().map(String::as_str).unwrap_or("unknown");

        match r.status {
            RunStatus::Pending => debug!(target: "qjob.observe.sink", job = %r.job, "{msg}"),
            RunStatus::Running => {
                trace!(target: "qjob.observe.sink", job = %r.job, host, "{msg}")
            }
            RunStatus::Done => {
                let elapsed_ms = r.info.elapsed().map(|d| d.as_millis() as u64).unwrap_or(0);
                info!(target: "qjob.observe.sink", job = %r.job, host, elapsed_ms, "{msg}")
            }
            RunStatus::Failed => warn!(
                target: "qjob.observe.sink",
                job = %r.job,
                host,
                code = ?r.exit_code,
                reason = r.error.as_deref().unwrap_or("unknown"),
                "{msg}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qjob_model::{JobId, RunInfo};
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(out.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        out.text()
    }

    fn report(status: RunStatus) -> StatusReport {
        StatusReport {
            job: JobId::from("job-1"),
            status,
            info: RunInfo::default(),
            exit_code: None,
            error: None,
        }
    }

    #[test]
    fn every_status_has_a_message() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Done,
            RunStatus::Failed,
        ] {
            assert!(!message_for(status).is_empty());
        }
    }

    #[test]
    fn failed_report_is_logged_as_warning_with_reason() {
        let logged = capture(|| {
            JournalSink::new().report(&StatusReport {
                exit_code: Some(1),
                error: Some("exit code: 1".into()),
                ..report(RunStatus::Failed)
            })
        });

        assert!(logged.contains("WARN"), "{logged}");
        assert!(logged.contains(message_for(RunStatus::Failed)), "{logged}");
        assert!(logged.contains("job-1"), "{logged}");
        assert!(logged.contains("exit code: 1"), "{logged}");
        assert!(logged.contains("unknown"), "{logged}");
    }

    #[test]
    fn levels_follow_status() {
        let running = capture(|| JournalSink::new().report(&report(RunStatus::Running)));
        assert!(running.contains("TRACE"), "{running}");
        assert!(running.contains(message_for(RunStatus::Running)), "{running}");

        let done = capture(|| JournalSink::new().report(&report(RunStatus::Done)));
        assert!(done.contains("INFO"), "{done}");
        assert!(done.contains("elapsed_ms=0"), "{done}");
    }
}
