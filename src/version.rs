//! Dot-separated integer versions as used by Tekton catalog tags.
//!
//! Versions compare as integer tuples, so `0.10` sorts after `0.9`.
//! Anything that does not parse is never considered newer.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed `major.minor[.patch...]` version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskVersion {
    parts: Vec<u64>,
}

/// Error returned when a version string has a non-numeric component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVersion(pub String);

impl fmt::Display for InvalidVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task version {:?}", self.0)
    }
}

impl std::error::Error for InvalidVersion {}

impl TaskVersion {
    /// Returns the numeric components in order.
    #[must_use]
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl FromStr for TaskVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split('.')
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| InvalidVersion(s.to_string()))?;
        Ok(Self { parts })
    }
}

impl Ord for TaskVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for TaskVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TaskVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        f.write_str(&joined)
    }
}

/// Returns `true` when `candidate` is strictly newer than `current`.
///
/// Fails closed: if either string is malformed the answer is `false`.
#[must_use]
pub fn is_newer_version(current: &str, candidate: &str) -> bool {
    match (current.parse::<TaskVersion>(), candidate.parse::<TaskVersion>()) {
        (Ok(current), Ok(candidate)) => candidate > current,
        _ => false,
    }
}

/// Returns `true` for registry tags shaped like `1.2` or `1.2.3`.
#[must_use]
pub fn is_semver_tag(tag: &str) -> bool {
    let parts: Vec<&str> = tag.split('.').collect();
    (2..=3).contains(&parts.len())
        && parts.iter().all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// Keeps only semver-shaped tags and sorts them ascending by version.
#[must_use]
pub fn sorted_semver_tags(tags: &[String]) -> Vec<String> {
    let mut versions: Vec<(TaskVersion, String)> = tags
        .iter()
        .filter(|t| is_semver_tag(t))
        .filter_map(|t| t.parse::<TaskVersion>().ok().map(|v| (v, t.clone())))
        .collect();
    versions.sort();
    versions.dedup();
    versions.into_iter().map(|(_, tag)| tag).collect()
}
