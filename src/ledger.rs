//! In-memory index over the trusted-tasks catalog.
//!
//! Keys have the form `oci://<registry>/<task>:<version>` and map to the
//! records published for that version, newest first. The record without an
//! `expires_on` marker is the currently trusted digest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bundle::task_key;
use crate::version::TaskVersion;

/// One digest published for a task version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedRecord {
    /// Content digest, `sha256:...`.
    #[serde(rename = "ref", default)]
    pub digest: String,
    /// When this digest stops being trusted; absent for the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<String>,
    /// When this digest became trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_on: Option<String>,
}

impl TrustedRecord {
    /// A record with no expiry.
    #[must_use]
    pub fn current(digest: impl Into<String>) -> Self {
        Self { digest: digest.into(), expires_on: None, effective_on: None }
    }

    /// A record that expires on the given date.
    #[must_use]
    pub fn expiring(digest: impl Into<String>, expires_on: impl Into<String>) -> Self {
        Self { digest: digest.into(), expires_on: Some(expires_on.into()), effective_on: None }
    }

    fn has_sha256(&self) -> bool {
        self.digest.starts_with("sha256:")
    }
}

/// The `data-acceptable-bundles` document layout.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    trusted_tasks: BTreeMap<String, Vec<TrustedRecord>>,
}

/// A resolved `(version, digest)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedDigest {
    /// Task version.
    pub version: String,
    /// Trusted digest for that version.
    pub digest: String,
}

/// Snapshot of trusted task digests, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: BTreeMap<String, Vec<TrustedRecord>>,
    source: String,
}

impl Ledger {
    /// Builds a ledger from already-parsed entries.
    #[must_use]
    pub fn new(entries: BTreeMap<String, Vec<TrustedRecord>>, source: impl Into<String>) -> Self {
        Self { entries, source: source.into() }
    }

    /// Parses the catalog YAML (a document with a `trusted_tasks` mapping).
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the document cannot be parsed.
    pub fn from_catalog_yaml(
        yaml: &str,
        source: impl Into<String>,
    ) -> Result<Self, serde_yaml::Error> {
        let doc: CatalogDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::new(doc.trusted_tasks, source))
    }

    /// Builds a ledger from registry tags and their manifest digests.
    ///
    /// Each tag becomes a version with a single, non-expiring record.
    #[must_use]
    pub fn from_tag_digests(
        registry: &str,
        task_name: &str,
        tag_digests: &[(String, String)],
        source: impl Into<String>,
    ) -> Self {
        let entries = tag_digests
            .iter()
            .filter(|(_, digest)| !digest.is_empty())
            .map(|(tag, digest)| {
                (task_key(registry, task_name, tag), vec![TrustedRecord::current(digest.clone())])
            })
            .collect();
        Self::new(entries, source)
    }

    /// Where the snapshot came from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of task-version keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the ledger has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the currently trusted digest for an exact task key.
    ///
    /// The first record without `expires_on` wins. If every record carries
    /// an expiry, the first record in catalog order is returned anyway.
    #[must_use]
    pub fn get_latest_trusted(&self, key: &str) -> Option<TrustedDigest> {
        let records = self.entries.get(key)?;
        let record = records
            .iter()
            .find(|r| r.expires_on.is_none() && r.has_sha256())
            .or_else(|| records.first().filter(|r| r.has_sha256()))?;
        Some(TrustedDigest { version: version_of_key(key), digest: record.digest.clone() })
    }

    /// Returns `true` if the ledger knows this exact task version.
    #[must_use]
    pub fn has_version(&self, registry: &str, task_name: &str, version: &str) -> bool {
        self.entries.contains_key(&task_key(registry, task_name, version))
    }

    /// All parseable versions of a task, ascending.
    #[must_use]
    pub fn versions(&self, registry: &str, task_name: &str) -> Vec<String> {
        self.parsed_versions(registry, task_name).into_iter().map(|(_, raw)| raw).collect()
    }

    /// Finds the highest version of a task and its trusted digest.
    ///
    /// Versions compare as integer tuples; keys with non-numeric versions
    /// are skipped.
    #[must_use]
    pub fn find_latest_version(&self, registry: &str, task_name: &str) -> Option<TrustedDigest> {
        let (_, latest) = self.parsed_versions(registry, task_name).pop()?;
        let trusted = self.get_latest_trusted(&task_key(registry, task_name, &latest))?;
        Some(TrustedDigest { version: latest, digest: trusted.digest })
    }

    /// Finds which version published `digest`, trusted or expired.
    ///
    /// When several versions list the digest, the highest one wins.
    #[must_use]
    pub fn version_for_digest(
        &self,
        registry: &str,
        task_name: &str,
        digest: &str,
    ) -> Option<String> {
        self.parsed_versions(registry, task_name)
            .into_iter()
            .rev()
            .map(|(_, raw)| raw)
            .find(|raw| {
                self.entries
                    .get(&task_key(registry, task_name, raw))
                    .is_some_and(|records| records.iter().any(|r| r.digest == digest))
            })
    }

    fn parsed_versions(&self, registry: &str, task_name: &str) -> Vec<(TaskVersion, String)> {
        let prefix = task_key(registry, task_name, "");
        let mut versions: Vec<(TaskVersion, String)> = self
            .entries
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|raw| raw.parse::<TaskVersion>().ok().map(|v| (v, raw.to_string())))
            .collect();
        versions.sort();
        versions
    }
}

/// Extracts the trailing `:<digits and dots>` version from a task key.
fn version_of_key(key: &str) -> String {
    key.rsplit_once(':')
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit() || b == b'.'))
        .unwrap_or_default()
        .to_string()
}
