//! Resolving EC findings against the live registry.
//!
//! For each finding the task's semver tags are listed, their digests are
//! fetched concurrently, and the tag/digest pairs form a one-task ledger
//! that the resolver works against.

use futures::future::join_all;
use serde::Serialize;

use crate::bundle::BundleReference;
use crate::config::RegistrySettings;
use crate::ec_log::TaskFinding;
use crate::ledger::Ledger;
use crate::ports::RegistryClient;
use crate::resolve::{abbreviate, resolve, ResolveRequest, VersionSource};
use crate::version::sorted_semver_tags;

/// Lookup result for one finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLookup {
    /// The finding as parsed from the log.
    #[serde(flatten)]
    pub finding: TaskFinding,
    /// Semver tags found in the registry, ascending.
    pub available_versions: Vec<String>,
    /// Version to move to.
    pub target_version: String,
    /// Digest to move to.
    pub target_digest: String,
    /// Which rule chose the target; absent on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_source: Option<VersionSource>,
    /// Target version differs from the current one.
    pub is_version_bump: bool,
    /// Resolution had to fall back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// The task could not be resolved at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskLookup {
    fn failed(finding: TaskFinding, error: &str) -> Self {
        Self {
            target_version: finding.current_version.clone(),
            target_digest: finding.latest_digest.clone(),
            finding,
            available_versions: Vec::new(),
            version_source: None,
            is_version_bump: false,
            warning: None,
            error: Some(error.to_string()),
        }
    }
}

/// Looks up every finding concurrently; results are sorted by task name.
pub async fn lookup_all(
    registry: &dyn RegistryClient,
    settings: &RegistrySettings,
    findings: Vec<TaskFinding>,
) -> Vec<TaskLookup> {
    let mut results =
        join_all(findings.into_iter().map(|finding| lookup_task(registry, settings, finding))).await;
    results.sort_by(|a, b| a.finding.task_name.cmp(&b.finding.task_name));
    results
}

/// Looks up a single finding.
///
/// Registry failures are logged and treated as missing data.
pub async fn lookup_task(
    registry: &dyn RegistryClient,
    settings: &RegistrySettings,
    finding: TaskFinding,
) -> TaskLookup {
    let task_name = finding.task_name.clone();
    tracing::info!("Processing task: {task_name}");
    if finding.is_untrusted {
        tracing::info!("  Task is UNTRUSTED - needs specific digest");
    }
    if let Some(version) = &finding.recommended_version {
        tracing::info!("  EC recommends version: {version}");
    }

    let repository = settings.task_repository(&task_name);
    let tags = match registry.list_tags(&repository).await {
        Ok(tags) => sorted_semver_tags(&tags),
        Err(e) => {
            tracing::warn!("Failed to list tags for {task_name}: {e}");
            Vec::new()
        }
    };
    if tags.is_empty() {
        tracing::warn!("  {task_name}: No semver tags found in registry!");
        return TaskLookup::failed(finding, "No semver tags found");
    }

    let (repo, name) = (repository.as_str(), task_name.as_str());
    let tag_digests = join_all(tags.iter().map(|tag| async move {
        let digest = match registry.manifest_digest(repo, tag).await {
            Ok(digest) => digest.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to get digest for {name}:{tag}: {e}");
                String::new()
            }
        };
        (tag.clone(), digest)
    }))
    .await;

    let prefix = settings.bundle_prefix();
    let image = format!("task-{task_name}");
    let ledger = Ledger::from_tag_digests(&prefix, &image, &tag_digests, repository.clone());
    let bundle = BundleReference {
        registry: prefix,
        task_name: image,
        version: finding.current_version.clone(),
        digest: finding.current_digest.clone(),
    };
    let request = ResolveRequest {
        required_digest: finding.required_digest.as_deref(),
        recommended_version: finding.recommended_version.as_deref(),
        advised_digest: Some(finding.latest_digest.as_str()),
        ..ResolveRequest::new(&bundle)
    };
    let update = resolve(&request, &ledger);

    match &update.warning {
        Some(warning) => tracing::warn!("  {task_name}: {warning}"),
        None => tracing::info!(
            "  {task_name}: {} {} ({})",
            update.target_version,
            abbreviate(&update.target_digest),
            update.version_source.as_str()
        ),
    }

    TaskLookup {
        available_versions: tags,
        is_version_bump: update.is_version_bump(),
        target_version: update.target_version,
        target_digest: update.target_digest,
        version_source: Some(update.version_source),
        warning: update.warning,
        error: None,
        finding,
    }
}
