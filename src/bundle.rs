//! Task bundle references embedded in pipeline definitions.
//!
//! A bundle reference looks like
//! `quay.io/konflux-ci/tekton-catalog/task-init:0.2@sha256:abc...`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static BUNDLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<registry>[^/]+(?:/[^/]+)+)/(?P<task>task-[^:/]+):(?P<version>[^@]+)@(?P<digest>sha256:[a-f0-9]+)$",
    )
    .expect("bundle pattern is valid")
});

static VALUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"value:\s*(.+)$").expect("value pattern is valid"));

/// A fully-qualified task bundle reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleReference {
    /// Registry and repository prefix, e.g. `quay.io/konflux-ci/tekton-catalog`.
    pub registry: String,
    /// Task image name including the `task-` prefix.
    pub task_name: String,
    /// Declared task version.
    pub version: String,
    /// Pinned content digest (`sha256:...`).
    pub digest: String,
}

/// Error returned when text is not a bundle reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotABundle(pub String);

impl fmt::Display for NotABundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a task bundle reference: {}", self.0)
    }
}

impl std::error::Error for NotABundle {}

impl BundleReference {
    /// Ledger key for this exact version: `oci://registry/task:version`.
    #[must_use]
    pub fn task_key(&self) -> String {
        task_key(&self.registry, &self.task_name, &self.version)
    }

    /// Reference text for the same task at another version and digest.
    #[must_use]
    pub fn with_target(&self, version: &str, digest: &str) -> String {
        format!("{}/{}:{version}@{digest}", self.registry, self.task_name)
    }
}

/// Builds the ledger key for a task version.
#[must_use]
pub fn task_key(registry: &str, task_name: &str, version: &str) -> String {
    format!("oci://{registry}/{task_name}:{version}")
}

impl FromStr for BundleReference {
    type Err = NotABundle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = BUNDLE_PATTERN.captures(s).ok_or_else(|| NotABundle(s.to_string()))?;
        Ok(Self {
            registry: caps["registry"].to_string(),
            task_name: caps["task"].to_string(),
            version: caps["version"].to_string(),
            digest: caps["digest"].to_string(),
        })
    }
}

impl fmt::Display for BundleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}@{}", self.registry, self.task_name, self.version, self.digest)
    }
}

/// A bundle reference found in a pipeline file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundReference {
    /// 1-based line number.
    pub line: usize,
    /// The parsed reference.
    pub reference: BundleReference,
}

/// Scans pipeline text for `value:` lines that carry a bundle reference.
///
/// Only lines mentioning `quay.io` or `registry` are considered, matching
/// how Tekton bundle resolver params are written.
#[must_use]
pub fn find_bundle_refs(content: &str) -> Vec<FoundReference> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            line.contains("value:") && (line.contains("quay.io") || line.contains("registry"))
        })
        .filter_map(|(idx, line)| {
            let caps = VALUE_PATTERN.captures(line.trim())?;
            let value = caps[1].trim().trim_matches(|c| c == '"' || c == '\'');
            let reference = value.parse::<BundleReference>().ok()?;
            Some(FoundReference { line: idx + 1, reference })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT: &str = "quay.io/konflux-ci/tekton-catalog/task-init:0.2@sha256:0123abcd";

    #[test]
    fn parses_bundle_reference() {
        let r: BundleReference = INIT.parse().unwrap();
        assert_eq!(r.registry, "quay.io/konflux-ci/tekton-catalog");
        assert_eq!(r.task_name, "task-init");
        assert_eq!(r.version, "0.2");
        assert_eq!(r.digest, "sha256:0123abcd");
        assert_eq!(r.to_string(), INIT);
        assert_eq!(r.task_key(), "oci://quay.io/konflux-ci/tekton-catalog/task-init:0.2");
    }

    #[test]
    fn rejects_non_task_images() {
        assert!("quay.io/ns/repo/buildah:1.0@sha256:abc".parse::<BundleReference>().is_err());
        assert!("quay.io/task-foo:0.1@sha256:abc".parse::<BundleReference>().is_err());
        assert!("quay.io/a/b/task-foo:0.1@md5:abc".parse::<BundleReference>().is_err());
        assert!("quay.io/a/b/task-foo:0.1".parse::<BundleReference>().is_err());
    }

    #[test]
    fn accepts_shorter_registry_paths() {
        let r: BundleReference = "quay.io/ns/task-foo:0.1@sha256:bbb".parse().unwrap();
        assert_eq!(r.registry, "quay.io/ns");
        assert_eq!(r.task_key(), "oci://quay.io/ns/task-foo:0.1");
    }

    #[test]
    fn with_target_keeps_registry_and_task() {
        let r: BundleReference = INIT.parse().unwrap();
        assert_eq!(
            r.with_target("0.3", "sha256:ff"),
            "quay.io/konflux-ci/tekton-catalog/task-init:0.3@sha256:ff"
        );
    }

    #[test]
    fn finds_refs_with_line_numbers() {
        let content = format!(
            "tasks:\n  - name: init\n    taskRef:\n      params:\n        - name: bundle\n          value: {INIT}\n        - name: kind\n          value: task\n"
        );
        let found = find_bundle_refs(&content);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 6);
        assert_eq!(found[0].reference.task_name, "task-init");
    }

    #[test]
    fn accepts_quoted_values() {
        let content = format!("          value: \"{INIT}\"\n");
        let found = find_bundle_refs(&content);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference.to_string(), INIT);
    }

    #[test]
    fn ignores_lines_without_value_key() {
        let content = format!("# pinned {INIT}\nimage: {INIT}\n");
        assert!(find_bundle_refs(&content).is_empty());
    }
}
