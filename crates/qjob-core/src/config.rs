use std::path::PathBuf;

use qjob_exec::{NativeSpecBuilder, NativeStyle, SubmitMode};

use crate::error::CoreError;

pub const ENV_DEBUG_ECHO: &str = "QJOB_DEBUG_ECHO";
pub const ENV_SUBMIT_PROGRAM: &str = "QJOB_SUBMIT_PROGRAM";
pub const ENV_NATIVE_STYLE: &str = "QJOB_NATIVE_STYLE";

/// Settings shared by every runner of one integration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerConfig {
    pub submit_mode: SubmitMode,
    pub native_style: NativeStyle,
    /// Appended to session-style native specs.
    pub fallback_native_spec: Option<String>,
    /// Copy job output to this process's console as well.
    pub debug_echo: bool,
}

impl RunnerConfig {
    pub fn with_submit_mode(mut self, mode: SubmitMode) -> Self {
        self.submit_mode = mode;
        self
    }

    pub fn with_native_style(mut self, style: NativeStyle) -> Self {
        self.native_style = style;
        self
    }

    pub fn with_fallback_native_spec(mut self, spec: impl Into<String>) -> Self {
        self.fallback_native_spec = Some(spec.into());
        self
    }

    pub fn with_debug_echo(mut self, echo: bool) -> Self {
        self.debug_echo = echo;
        self
    }

    pub fn spec_builder(&self) -> NativeSpecBuilder {
        let builder = NativeSpecBuilder::new(self.native_style);
        match &self.fallback_native_spec {
            Some(spec) => builder.with_fallback(spec.clone()),
            None => builder,
        }
    }

    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden from `lookup`.
    ///
    /// Recognised keys: `QJOB_DEBUG_ECHO` (`1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off`),
    /// `QJOB_SUBMIT_PROGRAM` (path of the submission executable, switches to command-line
    /// submission), `QJOB_NATIVE_STYLE` (`session` or `command-line`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_DEBUG_ECHO) {
            cfg.debug_echo = parse_flag(ENV_DEBUG_ECHO, &raw)?;
        }
        if let Some(program) = lookup(ENV_SUBMIT_PROGRAM)
            && !program.trim().is_empty()
        {
            cfg.submit_mode = SubmitMode::CommandLine {
                program: PathBuf::from(program.trim()),
            };
        }
        if let Some(raw) = lookup(ENV_NATIVE_STYLE) {
            cfg.native_style = match raw.trim().to_ascii_lowercase().as_str() {
                "session" => NativeStyle::SessionMegabytes,
                "command-line" | "cmdline" => NativeStyle::CommandLineGigabytes,
                other => {
                    return Err(CoreError::InvalidConfig(format!(
                        "{ENV_NATIVE_STYLE}: unknown native style '{other}'"
                    )));
                }
            };
        }
        Ok(cfg)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(CoreError::InvalidConfig(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on processes launched at once through one pool; `None` is unbounded.
    pub max_concurrent_launches: Option<usize>,
}

impl PoolConfig {
    pub fn with_max_concurrent_launches(mut self, max: usize) -> Self {
        self.max_concurrent_launches = Some(max);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_concurrent_launches == Some(0) {
            return Err(CoreError::InvalidConfig(
                "max_concurrent_launches must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, RunnerConfig::default());
        assert_eq!(cfg.submit_mode, SubmitMode::Local);
        assert!(!cfg.debug_echo);
    }

    #[test]
    fn environment_overrides_apply() {
        let cfg = RunnerConfig::from_lookup(lookup(&[
            (ENV_DEBUG_ECHO, "yes"),
            (ENV_SUBMIT_PROGRAM, "/usr/bin/srun"),
            (ENV_NATIVE_STYLE, "Session"),
        ]))
        .unwrap();

        assert!(cfg.debug_echo);
        assert_eq!(
            cfg.submit_mode,
            SubmitMode::CommandLine {
                program: PathBuf::from("/usr/bin/srun")
            }
        );
        assert_eq!(cfg.native_style, NativeStyle::SessionMegabytes);
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = RunnerConfig::from_lookup(lookup(&[(ENV_DEBUG_ECHO, "maybe")])).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));

        let err = RunnerConfig::from_lookup(lookup(&[(ENV_NATIVE_STYLE, "pbs")])).unwrap_err();
        assert!(err.to_string().contains("pbs"));
    }

    #[test]
    fn spec_builder_carries_style_and_fallback() {
        let cfg = RunnerConfig::default()
            .with_native_style(NativeStyle::SessionMegabytes)
            .with_fallback_native_spec("--partition=main");
        let builder = cfg.spec_builder();
        assert_eq!(builder.style(), NativeStyle::SessionMegabytes);
    }

    #[test]
    fn zero_launch_bound_is_invalid() {
        assert!(PoolConfig::default().validate().is_ok());
        assert!(PoolConfig::default().with_max_concurrent_launches(2).validate().is_ok());
        assert!(
            PoolConfig::default()
                .with_max_concurrent_launches(0)
                .validate()
                .is_err()
        );
    }
}
