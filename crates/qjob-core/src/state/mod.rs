use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::SystemTime,
};

use qjob_model::{JobId, RunInfo, RunStatus};

/// Status of one job as pushed to a [`StatusSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub job: JobId,
    pub status: RunStatus,
    pub info: RunInfo,
    pub exit_code: Option<i32>,
    /// Failure description for `Failed` runs.
    pub error: Option<String>,
}

/// External status store fed by runners.
///
/// Runners report on every transition and every liveness poll, so implementations must accept
/// the same report repeatedly.
pub trait StatusSink: Send + Sync {
    fn report(&self, report: &StatusReport);
}

/// Sink that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StatusSink for NoopSink {
    fn report(&self, _report: &StatusReport) {}
}

/// Last known state of a job in a [`StatusBoard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub status: RunStatus,
    pub info: RunInfo,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    /// When the last report for this job arrived.
    pub updated_at: SystemTime,
    /// Number of reports received.
    pub reports: u64,
}

/// In-memory job status storage.
#[derive(Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<HashMap<JobId, JobEntry>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report at an explicit time.
    ///
    /// A terminal entry is never moved back to an active status.
    pub fn record_at(&self, report: &StatusReport, at: SystemTime) {
        let mut jobs = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        match jobs.get_mut(&report.job) {
            Some(entry) => {
                entry.updated_at = at;
                entry.reports += 1;
                if entry.status.is_terminal() && !report.status.is_terminal() {
                    return;
                }
                entry.status = report.status;
                entry.info = report.info.clone();
                entry.exit_code = report.exit_code;
                if report.error.is_some() {
                    entry.error = report.error.clone();
                }
            }
            None => {
                jobs.insert(
                    report.job.clone(),
                    JobEntry {
                        status: report.status,
                        info: report.info.clone(),
                        exit_code: report.exit_code,
                        error: report.error.clone(),
                        updated_at: at,
                        reports: 1,
                    },
                );
            }
        }
    }

    pub fn get(&self, id: &JobId) -> Option<JobEntry> {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(id).cloned()
    }

    pub fn remove(&self, id: &JobId) -> Option<JobEntry> {
        let mut jobs = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        jobs.remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List jobs currently in `status`.
    pub fn list_by_status(&self, status: RunStatus) -> Vec<JobId> {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<JobId> = jobs
            .iter()
            .filter(|(_, entry)| entry.status == status)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Active jobs whose last report is older than `cutoff`.
    ///
    /// A poller treats these as abandoned.
    pub fn stale_since(&self, cutoff: SystemTime) -> Vec<JobId> {
        let jobs = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<JobId> = jobs
            .iter()
            .filter(|(_, entry)| entry.status.is_active() && entry.updated_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl StatusSink for StatusBoard {
    fn report(&self, report: &StatusReport) {
        self.record_at(report, SystemTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(id: &str, status: RunStatus) -> StatusReport {
        StatusReport {
            job: JobId::from(id),
            status,
            info: RunInfo::default(),
            exit_code: None,
            error: None,
        }
    }

    #[test]
    fn record_and_get() {
        let board = StatusBoard::new();
        board.report(&report("job-1", RunStatus::Running));

        let entry = board.get(&JobId::from("job-1")).expect("job should exist");
        assert_eq!(entry.status, RunStatus::Running);
        assert_eq!(entry.reports, 1);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn failed_report_keeps_error() {
        let board = StatusBoard::new();
        board.report(&report("job-1", RunStatus::Running));
        board.report(&StatusReport {
            exit_code: Some(2),
            error: Some("exit code: 2".into()),
            ..report("job-1", RunStatus::Failed)
        });

        let entry = board.get(&JobId::from("job-1")).unwrap();
        assert_eq!(entry.status, RunStatus::Failed);
        assert_eq!(entry.exit_code, Some(2));
        assert_eq!(entry.error.as_deref(), Some("exit code: 2"));
    }

    #[test]
    fn terminal_entry_is_not_revived() {
        let board = StatusBoard::new();
        board.report(&report("job-1", RunStatus::Done));
        board.report(&report("job-1", RunStatus::Running));

        let entry = board.get(&JobId::from("job-1")).unwrap();
        assert_eq!(entry.status, RunStatus::Done);
        assert_eq!(entry.reports, 2);
    }

    #[test]
    fn list_by_status_filters() {
        let board = StatusBoard::new();
        board.report(&report("a", RunStatus::Running));
        board.report(&report("b", RunStatus::Running));
        board.report(&report("c", RunStatus::Failed));

        assert_eq!(
            board.list_by_status(RunStatus::Running),
            vec![JobId::from("a"), JobId::from("b")]
        );
        assert_eq!(board.list_by_status(RunStatus::Failed), vec![JobId::from("c")]);
        assert!(board.list_by_status(RunStatus::Done).is_empty());
    }

    #[test]
    fn stale_since_only_reports_active_jobs() {
        let board = StatusBoard::new();
        let t0 = SystemTime::now();
        let later = t0 + Duration::from_secs(60);

        board.record_at(&report("quiet", RunStatus::Running), t0);
        board.record_at(&report("fresh", RunStatus::Running), later);
        board.record_at(&report("finished", RunStatus::Done), t0);

        let cutoff = t0 + Duration::from_secs(30);
        assert_eq!(board.stale_since(cutoff), vec![JobId::from("quiet")]);

        // A heartbeat refreshes the entry.
        board.record_at(&report("quiet", RunStatus::Running), later);
        assert!(board.stale_since(cutoff).is_empty());
    }

    #[test]
    fn remove_deletes_entry() {
        let board = StatusBoard::new();
        board.report(&report("job-1", RunStatus::Running));
        assert!(board.remove(&JobId::from("job-1")).is_some());
        assert!(board.get(&JobId::from("job-1")).is_none());
        assert!(board.is_empty());
    }
}
