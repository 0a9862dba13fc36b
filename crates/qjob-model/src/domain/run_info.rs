use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Diagnostic timestamps and placement of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    /// When `start()` moved the job to running.
    #[serde(default, with = "opt_time_serde", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<SystemTime>,
    /// When the process exit (or launch failure) was observed.
    #[serde(default, with = "opt_time_serde", skip_serializing_if = "Option::is_none")]
    pub done_time: Option<SystemTime>,
    /// Host(s) the job executes on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exec_hosts: Vec<String>,
}

impl RunInfo {
    /// Wall-clock runtime, once both timestamps are known.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.done_time) {
            (Some(start), Some(done)) => done.duration_since(start).ok(),
            _ => None,
        }
    }
}

mod opt_time_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => {
                let since_epoch = t
                    .duration_since(UNIX_EPOCH)
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&since_epoch.as_secs())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SystemTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}
