//! Human and JSON renderings of command results.

use std::fmt::Write as _;

use serde::{Serialize, Serializer};

use crate::lookup::TaskLookup;
use crate::pipeline::AnalysisResult;
use crate::resolve::{abbreviate, VersionSource};

/// Last `n` characters of a digest.
fn tail(digest: &str, n: usize) -> &str {
    let start = digest.char_indices().rev().nth(n.saturating_sub(1)).map_or(0, |(i, _)| i);
    &digest[start..]
}

/// Per-file analysis results, in the order the files were given.
pub type FileResults = [(String, AnalysisResult)];

/// Renders the `update` summary.
#[must_use]
pub fn update_summary(results: &FileResults, dry_run: bool) -> String {
    let total_updates: usize = results.iter().map(|(_, r)| r.updates.len()).sum();
    let total_upgrades: usize = results.iter().map(|(_, r)| r.available_upgrades.len()).sum();
    let mut out = String::new();

    if total_updates == 0 && total_upgrades == 0 {
        out.push_str("\nAll task bundles are up to date!\n");
        return out;
    }

    if total_updates > 0 {
        let mode = if dry_run { " (dry-run)" } else { "" };
        let _ = writeln!(out, "\nFound {total_updates} task(s) needing updates{mode}:\n");

        for (path, result) in results.iter().filter(|(_, r)| !r.updates.is_empty()) {
            let _ = writeln!(out, "{path}");
            let (bumps, digests): (Vec<_>, Vec<_>) =
                result.updates.iter().map(|l| &l.update).partition(|u| u.is_version_bump());

            if !bumps.is_empty() {
                out.push_str("  Version upgrades:\n");
                for u in bumps {
                    let _ = writeln!(
                        out,
                        "    {}: {} → {}",
                        u.task_name, u.current_version, u.target_version
                    );
                }
            }
            if !digests.is_empty() {
                out.push_str("  Digest updates:\n");
                for u in digests {
                    let _ = writeln!(
                        out,
                        "    {}:{} @...{} → @...{}",
                        u.task_name,
                        u.current_version,
                        tail(&u.current_digest, 12),
                        tail(&u.target_digest, 12)
                    );
                    if let Some(newer) = &u.newer_version_available {
                        let _ = writeln!(out, "        newer version available: {newer}");
                    }
                }
            }
            out.push('\n');
        }

        if dry_run {
            out.push_str("Run without --dry-run to apply these changes.\n\n");
        }
    }

    if total_upgrades > 0 {
        out.push_str("Newer versions available (use --upgrade-versions to apply):\n\n");
        for located in results.iter().flat_map(|(_, r)| &r.available_upgrades) {
            let u = &located.update;
            let newer = u.newer_version_available.as_deref().unwrap_or(&u.target_version);
            let _ = writeln!(out, "  {}: {} → {newer}", u.task_name, u.current_version);
        }
        out.push('\n');
    }

    out
}

#[derive(Serialize)]
struct UpdateEntry<'a> {
    task_name: &'a str,
    current_version: &'a str,
    current_digest: &'a str,
    target_version: &'a str,
    target_digest: &'a str,
    version_source: VersionSource,
    location: Option<&'a str>,
    is_version_bump: bool,
    newer_version_available: Option<&'a str>,
}

#[derive(Serialize)]
struct UpgradeEntry<'a> {
    task_name: &'a str,
    current_version: &'a str,
    newer_version_available: Option<&'a str>,
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'a str>,
}

#[derive(Serialize)]
struct FileEntry<'a> {
    updates: Vec<UpdateEntry<'a>>,
    available_upgrades: Vec<UpgradeEntry<'a>>,
}

impl<'a> From<&'a AnalysisResult> for FileEntry<'a> {
    fn from(result: &'a AnalysisResult) -> Self {
        let updates = result
            .updates
            .iter()
            .map(|l| {
                let u = &l.update;
                UpdateEntry {
                    task_name: &u.task_name,
                    current_version: &u.current_version,
                    current_digest: &u.current_digest,
                    target_version: &u.target_version,
                    target_digest: &u.target_digest,
                    version_source: u.version_source,
                    location: u.location.as_deref(),
                    is_version_bump: u.is_version_bump(),
                    newer_version_available: u.newer_version_available.as_deref(),
                }
            })
            .collect();
        let available_upgrades = result
            .available_upgrades
            .iter()
            .map(|l| {
                let u = &l.update;
                UpgradeEntry {
                    task_name: &u.task_name,
                    current_version: &u.current_version,
                    newer_version_available: u.newer_version_available.as_deref(),
                    location: u.location.as_deref(),
                    warning: u.warning.as_deref(),
                }
            })
            .collect();
        Self { updates, available_upgrades }
    }
}

/// JSON object keyed by file path, preserving input order.
struct UpdateReport<'a>(&'a FileResults);

impl Serialize for UpdateReport<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(path, result)| (path, FileEntry::from(result))))
    }
}

/// Renders the `update` results as pretty JSON.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn update_json(results: &FileResults) -> Result<String, String> {
    serde_json::to_string_pretty(&UpdateReport(results))
        .map_err(|e| format!("failed to serialize results: {e}"))
}

/// Renders `lookup` results as pretty JSON.
///
/// # Errors
///
/// Returns an error string if serialization fails.
pub fn lookup_json(results: &[TaskLookup]) -> Result<String, String> {
    serde_json::to_string_pretty(results).map_err(|e| format!("failed to serialize results: {e}"))
}

/// Renders the `lookup` summary.
#[must_use]
pub fn lookup_summary(results: &[TaskLookup]) -> String {
    let (untrusted, regular): (Vec<&TaskLookup>, Vec<&TaskLookup>) =
        results.iter().partition(|r| r.finding.is_untrusted);
    let bumps: Vec<_> = regular.iter().filter(|r| r.is_version_bump).collect();
    let digest_updates: Vec<_> =
        regular.iter().filter(|r| !r.is_version_bump && r.error.is_none()).collect();
    let warnings: Vec<_> = results.iter().filter(|r| r.warning.is_some()).collect();
    let errors: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    let mut out = String::from("\n## Konflux Tekton Tasks Version Lookup\n\n");
    out.push_str("### Summary\n");
    let _ = writeln!(out, "- Total tasks: {}", results.len());
    let _ = writeln!(out, "- **Untrusted tasks (BLOCKING)**: {}", untrusted.len());
    let _ = writeln!(out, "- Version bumps: {}", bumps.len());
    let _ = writeln!(out, "- Digest updates: {}", digest_updates.len());
    let _ = writeln!(out, "- Warnings: {}", warnings.len());
    let _ = writeln!(out, "- Errors: {}\n", errors.len());

    if !untrusted.is_empty() {
        out.push_str("### Untrusted Tasks (BLOCKING - must fix)\n");
        for r in &untrusted {
            let _ = writeln!(
                out,
                "- **{}**: needs digest {} (version {})",
                r.finding.task_name,
                abbreviate(&r.target_digest),
                r.target_version
            );
        }
        out.push('\n');
    }

    if !bumps.is_empty() {
        out.push_str("### Version Bumps (require migration notes check)\n");
        for r in &bumps {
            let via = match r.version_source {
                Some(VersionSource::DigestMatch) | None => String::new(),
                Some(source) => format!(" (via {})", source.as_str()),
            };
            let _ = writeln!(
                out,
                "- **{}**: {} → {}{via}",
                r.finding.task_name, r.finding.current_version, r.target_version
            );
        }
        out.push('\n');
    }

    if !digest_updates.is_empty() {
        out.push_str("### Digest Updates (same version, new digest)\n");
        for r in &digest_updates {
            let _ = writeln!(
                out,
                "- {}: {}@...{} → @...{}",
                r.finding.task_name,
                r.finding.current_version,
                tail(&r.finding.current_digest, 12),
                tail(&r.target_digest, 12)
            );
        }
        out.push('\n');
    }

    if !warnings.is_empty() {
        out.push_str("### Warnings\n");
        for r in &warnings {
            let _ = writeln!(out, "- **{}**: {}", r.finding.task_name, r.warning.as_deref().unwrap_or_default());
        }
        out.push('\n');
    }

    if !errors.is_empty() {
        out.push_str("### Errors\n");
        for r in &errors {
            let _ = writeln!(out, "- **{}**: {}", r.finding.task_name, r.error.as_deref().unwrap_or_default());
        }
        out.push('\n');
    }

    out.push_str("### Update Mapping\n```\n");
    for r in results.iter().filter(|r| r.error.is_none()) {
        let name = &r.finding.task_name;
        let _ = writeln!(out, "task-{name}:{}@{}", r.finding.current_version, r.finding.current_digest);
        let _ = writeln!(out, "  → task-{name}:{}@{}\n", r.target_version, r.target_digest);
    }
    out.push_str("```\n");
    out
}
