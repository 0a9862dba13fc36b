use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Environment variables passed to the launched job.
///
/// Stored as an ordered list of key–value pairs and serialized as a transparent array.
/// Later entries override earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobEnv(pub Vec<KeyValue>);

impl JobEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the value for a key, returning the last matching entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Append a key–value pair.
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::JobEnv;

    #[test]
    fn push_and_override_last_wins() {
        let mut env = JobEnv::new();
        env.push("TMPDIR", "/scratch/a");
        env.push("OMP_NUM_THREADS", "4");
        env.push("TMPDIR", "/scratch/b");

        assert_eq!(env.len(), 3);
        assert_eq!(env.get("TMPDIR"), Some("/scratch/b"));
        assert_eq!(env.get("OMP_NUM_THREADS"), Some("4"));
        assert!(env.get("HOME").is_none());
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut env = JobEnv::new();
        env.push("FOO", "bar");

        let json = serde_json::to_string(&env).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"key\":\"FOO\""));

        let back: JobEnv = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("FOO"), Some("bar"));
    }
}
