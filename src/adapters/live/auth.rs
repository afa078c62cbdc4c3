//! Registry credential discovery.
//!
//! Sources are tried in order: the `QUAY_REGISTRY_TOKEN` environment
//! variable (a `Bearer ` prefix marks a ready token, anything else is a
//! Basic credential), the containers `auth.json` (runtime dir, then
//! `~/.config/containers`), the Docker `config.json`, and finally anonymous
//! access, which is enough for the public Konflux catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable holding a ready-made bearer token.
pub const TOKEN_ENV: &str = "QUAY_REGISTRY_TOKEN";

/// A credential for the registry token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCredential {
    /// Used directly as `Authorization: Bearer <token>`.
    Bearer(String),
    /// Base64 `user:password`, exchanged for a bearer token.
    Basic(String),
}

/// Result of credential discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAuth {
    /// The credential, or `None` for anonymous access.
    pub credential: Option<RegistryCredential>,
    /// Human-readable description of where it came from.
    pub source: String,
}

#[derive(Debug, Deserialize)]
struct AuthFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
}

/// Discovers credentials for `host` from the real environment.
#[must_use]
pub fn discover(host: &str) -> DiscoveredAuth {
    discover_with(host, |key| std::env::var(key).ok())
}

/// Discovers credentials using an arbitrary environment lookup.
#[must_use]
pub fn discover_with(host: &str, env: impl Fn(&str) -> Option<String>) -> DiscoveredAuth {
    if let Some(token) = env(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        tracing::info!("Found auth token in {TOKEN_ENV} environment variable");
        let token = token.trim();
        let credential = match token.strip_prefix("Bearer ") {
            Some(bearer) => RegistryCredential::Bearer(bearer.to_string()),
            None => RegistryCredential::Basic(token.to_string()),
        };
        return DiscoveredAuth {
            credential: Some(credential),
            source: format!("{TOKEN_ENV} environment variable"),
        };
    }

    let home = env("HOME").map(PathBuf::from);
    let mut candidates: Vec<(PathBuf, &str)> = Vec::new();
    if let Some(runtime) = env("XDG_RUNTIME_DIR").filter(|d| !d.is_empty()) {
        candidates.push((Path::new(&runtime).join("containers/auth.json"), "containers auth"));
    }
    if let Some(home) = &home {
        candidates.push((home.join(".config/containers/auth.json"), "containers auth"));
        candidates.push((home.join(".docker/config.json"), "Docker config"));
    }

    for (path, kind) in candidates {
        if let Some(auth) = read_auth(&path, host) {
            tracing::info!("Found auth for {host} in {}", path.display());
            return DiscoveredAuth {
                credential: Some(RegistryCredential::Basic(auth)),
                source: format!("{kind} ({})", path.display()),
            };
        }
    }

    tracing::info!("No registry auth found, using anonymous access");
    DiscoveredAuth { credential: None, source: "anonymous access".to_string() }
}

fn read_auth(path: &Path, host: &str) -> Option<String> {
    if !path.exists() {
        return None;
    }
    tracing::debug!("Checking auth file: {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| tracing::debug!("Failed to read {}: {e}", path.display()))
        .ok()?;
    let file: AuthFile = serde_json::from_str(&content)
        .map_err(|e| tracing::debug!("Failed to parse {}: {e}", path.display()))
        .ok()?;
    file.auths.get(host)?.auth.clone().filter(|a| !a.is_empty())
}
