use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{DelaySecs, JobEnv, ModelError, ResourceRequest, sanitize_job_name};

/// Everything needed to launch one command.
///
/// Built once through [`JobDescription::builder`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescription {
    /// Program to execute.
    pub executable: PathBuf,
    /// Ordered command-line arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Human-readable job name, passed to the scheduler after sanitization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub resources: ResourceRequest,
    /// Skip the multi-core flag even when more than one core is requested.
    #[serde(default)]
    pub dont_request_multiple_cores: bool,
    /// File receiving standard output (appended).
    pub output_file: PathBuf,
    /// File receiving standard error (appended); `None` merges stderr into stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
    /// Working directory; `None` inherits the controller's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Delay slept on the background task before launching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_delay_secs: Option<DelaySecs>,
    #[serde(default, skip_serializing_if = "JobEnv::is_empty")]
    pub env: JobEnv,
}

impl JobDescription {
    pub fn builder(
        executable: impl Into<PathBuf>,
        output_file: impl Into<PathBuf>,
    ) -> JobDescriptionBuilder {
        JobDescriptionBuilder::new(executable, output_file)
    }

    /// Job name with scheduler-forbidden characters replaced.
    ///
    /// Falls back to the executable's file name when no name was given.
    pub fn sanitized_name(&self) -> String {
        let raw = self
            .name
            .clone()
            .or_else(|| {
                self.executable
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "job".to_string());
        sanitize_job_name(&raw)
    }

    /// Check the invariants the builder enforces.
    ///
    /// Descriptions built by hand or deserialized skip the builder, so consumers call this
    /// before acting on them.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.executable.as_os_str().is_empty() {
            return Err(ModelError::EmptyExecutable);
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(ModelError::EmptyOutput);
        }
        self.resources.validate()
    }

    /// Whether stderr is merged into the output file.
    #[inline]
    pub fn merges_stderr(&self) -> bool {
        self.error_file.is_none()
    }
}

/// Builder for [`JobDescription`].
#[derive(Debug, Clone)]
pub struct JobDescriptionBuilder {
    inner: JobDescription,
}

impl JobDescriptionBuilder {
    pub fn new(executable: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            inner: JobDescription {
                executable: executable.into(),
                args: Vec::new(),
                name: None,
                resources: ResourceRequest::default(),
                dont_request_multiple_cores: false,
                output_file: output_file.into(),
                error_file: None,
                working_dir: None,
                start_delay_secs: None,
                env: JobEnv::new(),
            },
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.inner.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner.name = Some(name.into());
        self
    }

    pub fn resources(mut self, resources: ResourceRequest) -> Self {
        self.inner.resources = resources;
        self
    }

    pub fn dont_request_multiple_cores(mut self, value: bool) -> Self {
        self.inner.dont_request_multiple_cores = value;
        self
    }

    pub fn error_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.error_file = Some(path.into());
        self
    }

    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.working_dir = Some(path.into());
        self
    }

    pub fn start_delay_secs(mut self, secs: DelaySecs) -> Self {
        self.inner.start_delay_secs = Some(secs);
        self
    }

    pub fn env<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.inner.env.push(key, value);
        self
    }

    pub fn build(self) -> Result<JobDescription, ModelError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
