use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Resource requests forwarded to the batch scheduler.
///
/// Every field is optional. A field that is `None` (or an empty list) never
/// produces a scheduler argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    /// Number of cores on a single node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,
    /// Memory limit in gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
    /// Wall-time limit in whole hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_time_hours: Option<u32>,
    /// Quality-of-service tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos: Option<String>,
    /// Raw scheduler arguments appended verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_native_args: Vec<String>,
}

impl ResourceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cores(mut self, cores: u32) -> Self {
        self.cores = Some(cores);
        self
    }

    pub fn with_memory_gb(mut self, gb: f64) -> Self {
        self.memory_gb = Some(gb);
        self
    }

    pub fn with_wall_time_hours(mut self, hours: u32) -> Self {
        self.wall_time_hours = Some(hours);
        self
    }

    pub fn with_qos(mut self, qos: impl Into<String>) -> Self {
        self.qos = Some(qos.into());
        self
    }

    pub fn with_extra_native_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_native_args.push(arg.into());
        self
    }

    /// Requested cores, defaulting to 1 when unset.
    ///
    /// Only used to decide whether a multi-core request is needed.
    #[inline]
    pub fn effective_cores(&self) -> u32 {
        self.cores.unwrap_or(1)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.cores == Some(0) {
            return Err(ModelError::InvalidResource("cores must be positive".into()));
        }
        if self.wall_time_hours == Some(0) {
            return Err(ModelError::InvalidResource(
                "wall time must be positive".into(),
            ));
        }
        if let Some(gb) = self.memory_gb
            && !(gb.is_finite() && gb > 0.0)
        {
            return Err(ModelError::InvalidResource(format!(
                "memory must be a positive number of gigabytes, got {gb}"
            )));
        }
        if let Some(qos) = &self.qos
            && qos.trim().is_empty()
        {
            return Err(ModelError::InvalidResource("qos must not be blank".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_cores_defaults_to_one() {
        assert_eq!(ResourceRequest::new().effective_cores(), 1);
        assert_eq!(ResourceRequest::new().with_cores(8).effective_cores(), 8);
    }

    #[test]
    fn validate_rejects_degenerate_values() {
        assert!(ResourceRequest::new().with_cores(0).validate().is_err());
        assert!(ResourceRequest::new().with_wall_time_hours(0).validate().is_err());
        assert!(ResourceRequest::new().with_memory_gb(0.0).validate().is_err());
        assert!(ResourceRequest::new().with_memory_gb(f64::NAN).validate().is_err());
        assert!(ResourceRequest::new().with_qos("  ").validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_and_full_requests() {
        assert!(ResourceRequest::new().validate().is_ok());
        let full = ResourceRequest::new()
            .with_cores(4)
            .with_memory_gb(2.5)
            .with_wall_time_hours(12)
            .with_qos("long")
            .with_extra_native_arg("--exclusive");
        assert!(full.validate().is_ok());
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let json = serde_json::to_string(&ResourceRequest::new().with_qos("short")).unwrap();
        assert_eq!(json, r#"{"qos":"short"}"#);
    }
}
