//! Translation of resource requests into scheduler arguments.
//!
//! Two integration styles are supported:
//! - [`NativeStyle::SessionMegabytes`]: one opaque "native specification" string handed to a
//!   session-based submission API. Memory is expressed in megabytes and a configured fallback
//!   specification is appended last.
//! - [`NativeStyle::CommandLineGigabytes`]: discrete tokens passed to the scheduler's submission
//!   executable. Memory is expressed in gigabytes with a `G` suffix.
//!
//! Arguments are always emitted in the same order (qos, memory, time, cores, extra args,
//! fallback).
use std::fmt;

use qjob_model::{JobDescription, PriorityBounds};
use tracing::{trace, warn};

/// Flag used to request several cores for one task.
pub const CPUS_FLAG: &str = "--cpus-per-task";

/// Scheduler integration style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeStyle {
    /// Session API, single spec string, memory in megabytes.
    SessionMegabytes,
    /// Submission executable, token list, memory in gigabytes.
    #[default]
    CommandLineGigabytes,
}

impl NativeStyle {
    /// Memory argument for a limit given in gigabytes, rounded up.
    pub fn memory_arg(&self, memory_gb: f64) -> String {
        match self {
            NativeStyle::SessionMegabytes => format!("--mem={}", ceil_units(memory_gb * 1024.0)),
            NativeStyle::CommandLineGigabytes => format!("--mem={}G", ceil_units(memory_gb)),
        }
    }

    /// Native priority range the scheduler accepts for this style.
    pub fn priority_bounds(&self) -> PriorityBounds {
        match self {
            NativeStyle::SessionMegabytes => PriorityBounds::new(-1023, 0),
            NativeStyle::CommandLineGigabytes => {
                PriorityBounds::new(-2_147_483_645, 2_147_483_645)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NativeStyle::SessionMegabytes => "session",
            NativeStyle::CommandLineGigabytes => "command-line",
        }
    }
}

fn ceil_units(value: f64) -> u64 {
    value.ceil() as u64
}

/// Non-fatal findings produced while building a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecWarning {
    /// More than one core was requested but multi-core requests are disabled.
    MultiCoreNotRequested { cores: u32 },
}

impl fmt::Display for SpecWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecWarning::MultiCoreNotRequested { cores } => write!(
                f,
                "job requests {cores} cores but multi-core requests are disabled; \
                 it may be scheduled without the cores it needs"
            ),
        }
    }
}

/// Generated scheduler arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSpec {
    pub style: NativeStyle,
    pub args: Vec<String>,
    pub warnings: Vec<SpecWarning>,
}

impl NativeSpec {
    /// Arguments joined into a single native specification string.
    pub fn to_spec_string(&self) -> String {
        self.args.join(" ").trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Returns `true` if any argument starts with `prefix`.
    pub fn has_flag(&self, prefix: &str) -> bool {
        self.args.iter().any(|a| a.starts_with(prefix))
    }
}

/// Stateless builder; holds only the style and the session fallback.
#[derive(Debug, Clone, Default)]
pub struct NativeSpecBuilder {
    style: NativeStyle,
    fallback: Option<String>,
}

impl NativeSpecBuilder {
    pub fn new(style: NativeStyle) -> Self {
        Self {
            style,
            fallback: None,
        }
    }

    /// Default native specification appended after generated flags.
    ///
    /// Only honored by [`NativeStyle::SessionMegabytes`].
    pub fn with_fallback(mut self, spec: impl Into<String>) -> Self {
        let spec = spec.into();
        self.fallback = if spec.trim().is_empty() {
            None
        } else {
            Some(spec)
        };
        self
    }

    #[inline]
    pub fn style(&self) -> NativeStyle {
        self.style
    }

    pub fn build(&self, job: &JobDescription) -> NativeSpec {
        let res = &job.resources;
        let mut args = Vec::new();
        let mut warnings = Vec::new();

        if let Some(qos) = &res.qos {
            args.push(format!("--qos={}", qos.trim()));
        }

        if let Some(gb) = res.memory_gb {
            args.push(self.style.memory_arg(gb));
        }

        if let Some(hours) = res.wall_time_hours {
            args.push(format!("--time={hours}:00:00"));
        }

        let cores = res.effective_cores();
        if cores > 1 {
            if job.dont_request_multiple_cores {
                let warning = SpecWarning::MultiCoreNotRequested { cores };
                warn!(target: "qjob.exec.native", job = %job.sanitized_name(), cores, "{warning}");
                warnings.push(warning);
            } else {
                args.push(format!("{CPUS_FLAG}={cores}"));
            }
        }

        args.extend(
            res.extra_native_args
                .iter()
                .flat_map(|a| a.split_whitespace())
                .map(str::to_string),
        );

        if self.style == NativeStyle::SessionMegabytes
            && let Some(fallback) = &self.fallback
        {
            args.push(fallback.trim().to_string());
        }

        trace!(target: "qjob.exec.native", style = self.style.as_str(), ?args, "native spec built");
        NativeSpec {
            style: self.style,
            args,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qjob_model::ResourceRequest;

    fn job(res: ResourceRequest) -> JobDescription {
        JobDescription::builder("/bin/true", "/tmp/out.log")
            .resources(res)
            .build()
            .unwrap()
    }

    fn both() -> [NativeSpecBuilder; 2] {
        [
            NativeSpecBuilder::new(NativeStyle::SessionMegabytes),
            NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes),
        ]
    }

    #[test]
    fn qos_only_emits_single_qos_token() {
        for b in both() {
            let spec = b.build(&job(ResourceRequest::new().with_qos("short")));
            assert_eq!(spec.args, vec!["--qos=short"]);
            assert!(!spec.has_flag("--mem"));
            assert!(!spec.has_flag("--time"));
            assert!(!spec.has_flag(CPUS_FLAG));
        }
    }

    #[test]
    fn empty_request_emits_nothing() {
        for b in both() {
            let spec = b.build(&job(ResourceRequest::new()));
            assert!(spec.is_empty());
            assert_eq!(spec.to_spec_string(), "");
        }
    }

    #[test]
    fn memory_in_megabytes_for_session_style() {
        let b = NativeSpecBuilder::new(NativeStyle::SessionMegabytes);
        let spec = b.build(&job(ResourceRequest::new().with_memory_gb(1.5)));
        assert_eq!(spec.args, vec!["--mem=1536"]);

        let spec = b.build(&job(ResourceRequest::new().with_memory_gb(0.3)));
        // 0.3 * 1024 = 307.2
        assert_eq!(spec.args, vec!["--mem=308"]);
    }

    #[test]
    fn memory_in_gigabytes_for_command_line_style() {
        let b = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes);
        let spec = b.build(&job(ResourceRequest::new().with_memory_gb(1.5)));
        assert_eq!(spec.args, vec!["--mem=2G"]);

        let spec = b.build(&job(ResourceRequest::new().with_memory_gb(4.0)));
        assert_eq!(spec.args, vec!["--mem=4G"]);
    }

    #[test]
    fn memory_is_monotonic_in_limit() {
        fn value(arg: &str) -> u64 {
            arg.trim_start_matches("--mem=")
                .trim_end_matches('G')
                .parse()
                .unwrap()
        }
        for style in [NativeStyle::SessionMegabytes, NativeStyle::CommandLineGigabytes] {
            let mut prev = 0;
            for step in 1..200 {
                let gb = step as f64 * 0.37;
                let v = value(&style.memory_arg(gb));
                assert!(v >= prev, "{style:?}: {gb} GB gave {v} < {prev}");
                prev = v;
            }
        }
    }

    #[test]
    fn wall_time_without_cores_or_memory() {
        for b in both() {
            let res = ResourceRequest::new().with_cores(1).with_wall_time_hours(4);
            let spec = b.build(&job(res));
            assert_eq!(spec.args, vec!["--time=4:00:00"]);
            assert!(spec.warnings.is_empty());
        }
    }

    #[test]
    fn multi_core_emits_cpus_flag() {
        let b = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes);
        let spec = b.build(&job(ResourceRequest::new().with_cores(4)));
        assert_eq!(spec.args, vec!["--cpus-per-task=4"]);
    }

    #[test]
    fn disabled_multi_core_warns_instead_of_failing() {
        let desc = JobDescription::builder("/bin/true", "/tmp/out.log")
            .resources(ResourceRequest::new().with_cores(4))
            .dont_request_multiple_cores(true)
            .build()
            .unwrap();

        for b in both() {
            let spec = b.build(&desc);
            assert!(!spec.has_flag(CPUS_FLAG));
            assert_eq!(
                spec.warnings,
                vec![SpecWarning::MultiCoreNotRequested { cores: 4 }]
            );
        }
    }

    #[test]
    fn full_request_keeps_fixed_order() {
        let res = ResourceRequest::new()
            .with_extra_native_arg("--exclusive  --constraint=avx2")
            .with_cores(8)
            .with_wall_time_hours(12)
            .with_memory_gb(16.0)
            .with_qos("long");
        let b = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes);
        let spec = b.build(&job(res));
        assert_eq!(
            spec.args,
            vec![
                "--qos=long",
                "--mem=16G",
                "--time=12:00:00",
                "--cpus-per-task=8",
                "--exclusive",
                "--constraint=avx2",
            ]
        );
    }

    #[test]
    fn session_fallback_is_appended_last() {
        let b = NativeSpecBuilder::new(NativeStyle::SessionMegabytes)
            .with_fallback("  --partition=general --account=lab ");
        let spec = b.build(&job(ResourceRequest::new().with_memory_gb(2.0)));
        assert_eq!(
            spec.to_spec_string(),
            "--mem=2048 --partition=general --account=lab"
        );
    }

    #[test]
    fn command_line_style_ignores_fallback() {
        let b = NativeSpecBuilder::new(NativeStyle::CommandLineGigabytes)
            .with_fallback("--partition=general");
        let spec = b.build(&job(ResourceRequest::new().with_qos("short")));
        assert_eq!(spec.args, vec!["--qos=short"]);
    }

    #[test]
    fn priority_bounds_per_style() {
        assert_eq!(
            NativeStyle::SessionMegabytes.priority_bounds(),
            PriorityBounds::new(-1023, 0)
        );
        let cli = NativeStyle::CommandLineGigabytes.priority_bounds();
        assert!(cli.min < 0 && cli.max > 0);
    }
}
