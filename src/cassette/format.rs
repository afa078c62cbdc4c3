//! On-disk cassette layout.
//!
//! One cassette holds the interactions of a single port for one run,
//! stored as YAML so recordings of registry responses and pipeline files
//! stay reviewable in diffs.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single call made through a port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Interaction {
    /// Position in the cassette, assigned by the recorder.
    pub seq: u64,
    /// Port name: `commands`, `fs` or `registry`.
    pub port: String,
    /// Method name invoked on the port.
    pub method: String,
    /// Call arguments. Registry replay matches on this.
    pub input: serde_json::Value,
    /// Return value, as `{"ok": ..}` / `{"err": ..}` for fallible methods.
    pub output: serde_json::Value,
}

/// A recorded session for one port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cassette {
    /// Session name, `<timestamp>-<port>` when written by a session.
    pub name: String,
    /// When recording started.
    pub recorded_at: DateTime<Utc>,
    /// Git commit of the working directory, or `unknown`.
    pub commit: String,
    /// Interactions in the order they completed.
    pub interactions: Vec<Interaction>,
}

impl Cassette {
    /// An empty cassette stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recorded_at: Utc::now(),
            commit: commit.into(),
            interactions: Vec::new(),
        }
    }

    /// Reads a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error string naming the file if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
    }

    /// Writes the cassette as YAML, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(std::io::Error::other)?;
        std::fs::write(path, yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_cassette() -> Cassette {
        let mut cassette = Cassette::new("test-cassette", "abc123");
        cassette.interactions = vec![
            Interaction {
                seq: 0,
                port: "registry".into(),
                method: "list_tags".into(),
                input: json!({"repository": "konflux-ci/tekton-catalog/task-init"}),
                output: json!({"ok": ["0.1", "0.2", "latest"]}),
            },
            Interaction {
                seq: 1,
                port: "fs".into(),
                method: "read_to_string".into(),
                input: json!({"path": ".tekton/pipelines/push.yaml"}),
                output: json!({"ok": "spec: {}\n"}),
            },
        ];
        cassette
    }

    #[test]
    fn save_then_load_keeps_structured_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.cassette.yaml");
        let cassette = sample_cassette();
        cassette.save(&path).unwrap();

        assert!(std::fs::read_to_string(&path).unwrap().contains("list_tags"));
        let loaded = Cassette::load(&path).unwrap();
        assert_eq!(loaded.interactions[0].output["ok"][2], "latest");
        assert_eq!(loaded, cassette);
    }

    #[test]
    fn load_reports_the_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("fs.cassette.yaml");
        assert!(Cassette::load(&missing).unwrap_err().contains("fs.cassette.yaml"));
    }
}
