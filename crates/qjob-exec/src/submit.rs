use std::path::PathBuf;

use qjob_model::JobDescription;
use tracing::debug;

use crate::{
    native::{NativeSpec, NativeStyle},
    proc::{LaunchSpec, OutputTarget},
};

/// How a job's command reaches the machine that runs it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmitMode {
    /// Run the executable directly on this host.
    #[default]
    Local,
    /// Run the scheduler's submission executable, which forwards the command to the cluster.
    CommandLine { program: PathBuf },
}

impl SubmitMode {
    /// Submission through `srun`.
    pub fn srun() -> Self {
        SubmitMode::CommandLine {
            program: PathBuf::from("srun"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Local => "local",
            SubmitMode::CommandLine { .. } => "command-line",
        }
    }
}

/// Compose the process launch for `job`.
///
/// In [`SubmitMode::CommandLine`] the command line is
/// `<program> --job-name=<name> <native args> <executable> <args>`. Session-style native
/// specifications are not command-line tokens, so they are never spliced into a command line.
pub fn launch_spec(
    job: &JobDescription,
    native: &NativeSpec,
    mode: &SubmitMode,
    echo: bool,
) -> LaunchSpec {
    let mut output = OutputTarget::new(&job.output_file).with_echo(echo);
    if let Some(err) = &job.error_file {
        output = output.with_stderr(err);
    }

    let mut spec = match mode {
        SubmitMode::Local => {
            if !native.is_empty() {
                debug!(
                    target: "qjob.exec.submit",
                    native = %native.to_spec_string(),
                    "local launch; native spec is not applied"
                );
            }
            LaunchSpec::new(&job.executable, output).with_args(job.args.iter().cloned())
        }
        SubmitMode::CommandLine { program } => {
            let mut args = vec![format!("--job-name={}", job.sanitized_name())];
            if native.style == NativeStyle::CommandLineGigabytes {
                args.extend(native.args.iter().cloned());
            } else {
                debug!(
                    target: "qjob.exec.submit",
                    "session-style native spec is not passed on the command line"
                );
            }
            args.push(job.executable.display().to_string());
            args.extend(job.args.iter().cloned());
            LaunchSpec::new(program, output).with_args(args)
        }
    };

    for kv in job.env.iter() {
        spec = spec.with_env(kv.key(), kv.value());
    }
    if let Some(cwd) = &job.working_dir {
        spec = spec.with_cwd(cwd);
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeSpecBuilder;
    use qjob_model::ResourceRequest;

    fn job() -> JobDescription {
        JobDescription::builder("/opt/bin/align", "/tmp/align.out")
            .args(["-t", "4", "ref.fa"])
            .name("align/chr1:part,2")
            .error_file("/tmp/align.err")
            .working_dir("/scratch/run")
            .env("TMPDIR", "/scratch/tmp")
            .resources(
                ResourceRequest::new()
                    .with_qos("short")
                    .with_memory_gb(3.2)
                    .with_cores(4),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn local_mode_runs_executable_directly() {
        let job = job();
        let native = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes).build(&job);
        let spec = launch_spec(&job, &native, &SubmitMode::Local, false);

        assert_eq!(spec.program, PathBuf::from("/opt/bin/align"));
        assert_eq!(spec.args, vec!["-t", "4", "ref.fa"]);
        assert_eq!(spec.cwd, Some(PathBuf::from("/scratch/run")));
        assert_eq!(
            spec.env,
            vec![(String::from("TMPDIR"), String::from("/scratch/tmp"))]
        );
        assert_eq!(spec.output.stderr, Some(PathBuf::from("/tmp/align.err")));
        assert!(!spec.output.echo);
    }

    #[test]
    fn command_line_mode_wraps_with_submitter() {
        let job = job();
        let native = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes).build(&job);
        let spec = launch_spec(&job, &native, &SubmitMode::srun(), true);

        assert_eq!(spec.program, PathBuf::from("srun"));
        assert_eq!(
            spec.args,
            vec![
                "--job-name=align_chr1_part_2",
                "--qos=short",
                "--mem=4G",
                "--cpus-per-task=4",
                "/opt/bin/align",
                "-t",
                "4",
                "ref.fa",
            ]
        );
        assert!(spec.output.echo);
    }

    #[test]
    fn session_spec_is_not_spliced_into_command_line() {
        let job = job();
        let native = NativeSpecBuilder::new(NativeStyle::SessionMegabytes).build(&job);
        let spec = launch_spec(&job, &native, &SubmitMode::srun(), false);

        assert!(!spec.args.iter().any(|a| a.starts_with("--mem")));
        assert_eq!(spec.args[0], "--job-name=align_chr1_part_2");
    }
}
