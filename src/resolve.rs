//! Trusted-bundle resolution.
//!
//! Given a bundle reference, a ledger snapshot and optional advisories,
//! decide which version and digest the task should be pinned to. The
//! decision is an ordered table of rules; the first rule that applies wins
//! and the highest-available fallback catches everything else, so every
//! request resolves to a concrete target.

use serde::{Deserialize, Serialize};

use crate::bundle::{task_key, BundleReference};
use crate::ledger::Ledger;
use crate::version::is_newer_version;

/// Why a target version was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// A policy check flagged the task as untrusted and named the digest.
    UntrustedRequired,
    /// A policy check recommended a specific version.
    EcRecommended,
    /// The version was kept (or identified) by digest.
    DigestMatch,
    /// The highest version in the ledger was adopted.
    HighestAvailable,
}

impl VersionSource {
    /// Snake-case label used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UntrustedRequired => "untrusted_required",
            Self::EcRecommended => "ec_recommended",
            Self::DigestMatch => "digest_match",
            Self::HighestAvailable => "highest_available",
        }
    }
}

/// Inputs to a single resolution.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// The reference currently in use.
    pub bundle: &'a BundleReference,
    /// Digest that must be used because the current one is untrusted.
    pub required_digest: Option<&'a str>,
    /// Version an external advisory says to move to.
    pub recommended_version: Option<&'a str>,
    /// Digest an external advisory reports as the latest for this task.
    pub advised_digest: Option<&'a str>,
    /// Whether moving to a newer version is allowed.
    pub allow_version_upgrade: bool,
}

impl<'a> ResolveRequest<'a> {
    /// A request with no advisories.
    #[must_use]
    pub fn new(bundle: &'a BundleReference) -> Self {
        Self {
            bundle,
            required_digest: None,
            recommended_version: None,
            advised_digest: None,
            allow_version_upgrade: false,
        }
    }

    /// Allows or forbids version upgrades.
    #[must_use]
    pub fn upgrade(mut self, allow: bool) -> Self {
        self.allow_version_upgrade = allow;
        self
    }
}

/// Resolver output for one bundle reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// Task image name (`task-...`).
    pub task_name: String,
    /// Registry and repository prefix.
    pub registry: String,
    /// Version in use.
    pub current_version: String,
    /// Digest in use.
    pub current_digest: String,
    /// Version to pin.
    pub target_version: String,
    /// Digest to pin.
    pub target_digest: String,
    /// Which rule produced the target.
    pub version_source: VersionSource,
    /// Set when resolution had to fall back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// `file:line` where the reference was found, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// A newer version than the target, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newer_version_available: Option<String>,
    /// Trusted digest of `newer_version_available`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newer_version_digest: Option<String>,
}

impl TaskUpdate {
    /// The digest changes.
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.current_digest != self.target_digest
    }

    /// The version changes.
    #[must_use]
    pub fn is_version_bump(&self) -> bool {
        self.current_version != self.target_version
    }

    /// A newer version than the target exists.
    #[must_use]
    pub fn has_newer_version(&self) -> bool {
        self.newer_version_available.is_some()
    }

    /// Reference text currently in the pipeline.
    #[must_use]
    pub fn current_ref(&self) -> String {
        format!("{}/{}:{}@{}", self.registry, self.task_name, self.current_version, self.current_digest)
    }

    /// Reference text to write instead.
    #[must_use]
    pub fn target_ref(&self) -> String {
        format!("{}/{}:{}@{}", self.registry, self.task_name, self.target_version, self.target_digest)
    }
}

/// What a rule decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Chosen version.
    pub version: String,
    /// Chosen digest.
    pub digest: String,
    /// Rule outcome label.
    pub source: VersionSource,
    /// Attached when the rule had to fall back.
    pub warning: Option<String>,
}

/// One row of the decision table.
pub struct Rule {
    /// Short name for logs and tests.
    pub name: &'static str,
    /// Returns a resolution when the rule applies.
    pub apply: fn(&ResolveRequest<'_>, &Ledger) -> Option<Resolution>,
}

/// Conditional rules in priority order. [`fallback`] runs when none apply.
pub const RULES: &[Rule] = &[
    Rule { name: "untrusted_required", apply: untrusted_required },
    Rule { name: "ec_recommended", apply: ec_recommended },
    Rule { name: "upgrade", apply: upgrade },
    Rule { name: "digest_match", apply: digest_match },
];

/// Resolves a request against a ledger snapshot.
///
/// Pure: neither the ledger nor anything else is mutated.
#[must_use]
pub fn resolve(request: &ResolveRequest<'_>, ledger: &Ledger) -> TaskUpdate {
    let bundle = request.bundle;
    let resolution = RULES
        .iter()
        .find_map(|rule| {
            let outcome = (rule.apply)(request, ledger);
            if outcome.is_some() {
                tracing::debug!(task = %bundle.task_name, rule = rule.name, "resolution rule matched");
            }
            outcome
        })
        .unwrap_or_else(|| fallback(request, ledger));

    let newer = ledger
        .find_latest_version(&bundle.registry, &bundle.task_name)
        .filter(|latest| is_newer_version(&resolution.version, &latest.version));

    TaskUpdate {
        task_name: bundle.task_name.clone(),
        registry: bundle.registry.clone(),
        current_version: bundle.version.clone(),
        current_digest: bundle.digest.clone(),
        target_version: resolution.version,
        target_digest: resolution.digest,
        version_source: resolution.source,
        warning: resolution.warning,
        location: None,
        newer_version_available: newer.as_ref().map(|n| n.version.clone()),
        newer_version_digest: newer.map(|n| n.digest),
    }
}

/// Untrusted digest override: the named digest must be used.
pub fn untrusted_required(request: &ResolveRequest<'_>, ledger: &Ledger) -> Option<Resolution> {
    let required = request.required_digest?;
    let bundle = request.bundle;
    match ledger.version_for_digest(&bundle.registry, &bundle.task_name, required) {
        Some(version) => Some(Resolution {
            version,
            digest: required.to_string(),
            source: VersionSource::UntrustedRequired,
            warning: None,
        }),
        None => Some(highest_available(request, ledger, |highest| {
            format!(
                "Required digest {} not found in trusted versions, using highest available {highest}",
                abbreviate(required)
            )
        })),
    }
}

/// Advisory-recommended version, when the ledger knows it.
pub fn ec_recommended(request: &ResolveRequest<'_>, ledger: &Ledger) -> Option<Resolution> {
    let recommended = request.recommended_version?;
    let bundle = request.bundle;
    let key = task_key(&bundle.registry, &bundle.task_name, recommended);
    match ledger.get_latest_trusted(&key) {
        Some(trusted) => Some(Resolution {
            version: recommended.to_string(),
            digest: trusted.digest,
            source: VersionSource::EcRecommended,
            warning: None,
        }),
        None => Some(highest_available(request, ledger, |highest| {
            format!("EC recommended version {recommended} not found, using {highest}")
        })),
    }
}

/// Opt-in move to a strictly newer version.
pub fn upgrade(request: &ResolveRequest<'_>, ledger: &Ledger) -> Option<Resolution> {
    if !request.allow_version_upgrade {
        return None;
    }
    let bundle = request.bundle;
    let latest = ledger.find_latest_version(&bundle.registry, &bundle.task_name)?;
    if !is_newer_version(&bundle.version, &latest.version) {
        return None;
    }
    Some(Resolution {
        version: latest.version,
        digest: latest.digest,
        source: VersionSource::HighestAvailable,
        warning: None,
    })
}

/// Digest refresh: identify the version by the advised digest, or keep the
/// current version and take its trusted digest.
pub fn digest_match(request: &ResolveRequest<'_>, ledger: &Ledger) -> Option<Resolution> {
    let bundle = request.bundle;
    if let Some(advised) = request.advised_digest {
        if let Some(version) = ledger.version_for_digest(&bundle.registry, &bundle.task_name, advised)
        {
            return Some(Resolution {
                version,
                digest: advised.to_string(),
                source: VersionSource::DigestMatch,
                warning: None,
            });
        }
    }
    let trusted = ledger.get_latest_trusted(&bundle.task_key())?;
    Some(Resolution {
        version: bundle.version.clone(),
        digest: trusted.digest,
        source: VersionSource::DigestMatch,
        warning: None,
    })
}

/// Last resort: adopt the highest available version with a warning.
#[must_use]
pub fn fallback(request: &ResolveRequest<'_>, ledger: &Ledger) -> Resolution {
    let bundle = request.bundle;
    let digest = request.advised_digest.unwrap_or(&bundle.digest);
    highest_available(request, ledger, |highest| {
        format!(
            "Digest {} of {}:{} not in trusted versions, using highest available {highest}",
            abbreviate(digest),
            bundle.task_name,
            bundle.version
        )
    })
}

fn highest_available(
    request: &ResolveRequest<'_>,
    ledger: &Ledger,
    warning: impl FnOnce(&str) -> String,
) -> Resolution {
    let bundle = request.bundle;
    match ledger.find_latest_version(&bundle.registry, &bundle.task_name) {
        Some(latest) => {
            let message = warning(&latest.version);
            Resolution {
                version: latest.version,
                digest: latest.digest,
                source: VersionSource::HighestAvailable,
                warning: Some(message),
            }
        }
        None => Resolution {
            version: bundle.version.clone(),
            digest: bundle.digest.clone(),
            source: VersionSource::HighestAvailable,
            warning: Some(format!(
                "No trusted versions of {} found, keeping current reference",
                bundle.task_name
            )),
        },
    }
}

/// First 20 characters of a digest, for messages.
#[must_use]
pub fn abbreviate(digest: &str) -> String {
    let short: String = digest.chars().take(20).collect();
    if short.len() < digest.len() {
        format!("{short}...")
    } else {
        short
    }
}
