//! Runtime configuration.
//!
//! Defaults target the public Konflux catalog. Each value can be overridden
//! through a `TEKBUMP_*` environment variable (a `.env` file in the working
//! directory is loaded first); command-line flags override both.

use std::time::Duration;

/// Trusted-tasks OCI artifact.
pub const DEFAULT_DATA_SOURCE: &str =
    "quay.io/konflux-ci/tekton-catalog/data-acceptable-bundles:latest";
/// Registry hosting the task bundles.
pub const DEFAULT_REGISTRY: &str = "quay.io";
/// URL scheme used to reach the registry.
pub const DEFAULT_REGISTRY_SCHEME: &str = "https";
/// Repository namespace of the task bundles.
pub const DEFAULT_CATALOG_REPO: &str = "konflux-ci/tekton-catalog";
/// Pipelines updated when no files are given.
pub const DEFAULT_PIPELINE_GLOB: &str = ".tekton/pipelines/*.yaml";

const DEFAULT_MAX_CONCURRENCY: usize = 20;
const DEFAULT_RETRY_LIMIT: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;

/// Registry access settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// URL scheme, `https` unless pointed at a plain-HTTP registry.
    pub scheme: String,
    /// Registry host, e.g. `quay.io`.
    pub host: String,
    /// Namespace holding `task-<name>` repositories.
    pub catalog_repo: String,
    /// Maximum in-flight registry requests.
    pub max_concurrency: usize,
    /// Retries after an HTTP 429 before giving up.
    pub retry_limit: u32,
    /// Fixed delay between 429 retries.
    pub retry_delay: Duration,
}

impl RegistrySettings {
    /// Root URL of the registry API (`https://quay.io`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Repository path for a task short name (`init` → `<catalog>/task-init`).
    #[must_use]
    pub fn task_repository(&self, task_name: &str) -> String {
        format!("{}/task-{task_name}", self.catalog_repo)
    }

    /// Registry prefix used in bundle references and ledger keys.
    #[must_use]
    pub fn bundle_prefix(&self) -> String {
        format!("{}/{}", self.host, self.catalog_repo)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_REGISTRY_SCHEME.to_string(),
            host: DEFAULT_REGISTRY.to_string(),
            catalog_repo: DEFAULT_CATALOG_REPO.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// OCI reference of the trusted-tasks artifact.
    pub data_source: String,
    /// Glob used when no pipeline files are given.
    pub pipeline_glob: String,
    /// Registry settings for `lookup`.
    pub registry: RegistrySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            pipeline_glob: DEFAULT_PIPELINE_GLOB.to_string(),
            registry: RegistrySettings::default(),
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and reads overrides from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error string when a numeric override does not parse.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error string when a numeric override does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();
        if let Some(v) = lookup("TEKBUMP_DATA_SOURCE") {
            config.data_source = v;
        }
        if let Some(v) = lookup("TEKBUMP_PIPELINE_GLOB") {
            config.pipeline_glob = v;
        }
        if let Some(v) = lookup("TEKBUMP_REGISTRY") {
            config.registry.host = v;
        }
        if let Some(v) = lookup("TEKBUMP_REGISTRY_SCHEME") {
            config.registry.scheme = v;
        }
        if let Some(v) = lookup("TEKBUMP_CATALOG_REPO") {
            config.registry.catalog_repo = v;
        }
        if let Some(v) = lookup("TEKBUMP_MAX_CONCURRENCY") {
            let n: usize = parse_number("TEKBUMP_MAX_CONCURRENCY", &v)?;
            config.registry.max_concurrency = n.max(1);
        }
        if let Some(v) = lookup("TEKBUMP_RETRY_LIMIT") {
            config.registry.retry_limit = parse_number("TEKBUMP_RETRY_LIMIT", &v)?;
        }
        if let Some(v) = lookup("TEKBUMP_RETRY_DELAY_MS") {
            config.registry.retry_delay =
                Duration::from_millis(parse_number("TEKBUMP_RETRY_DELAY_MS", &v)?);
        }
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
    value.trim().parse().map_err(|_| format!("{key} must be a non-negative integer, got {value:?}"))
}
