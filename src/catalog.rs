//! Fetching the trusted-tasks catalog from its OCI artifact.
//!
//! The artifact is copied with `skopeo` into a scratch directory; its
//! `manifest.json` names the layer titled `trusted_tekton_tasks`, whose blob
//! is the YAML catalog. Every failure here is fatal for the run.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::ledger::Ledger;
use crate::ports::{CommandRunner, FileSystem};

const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";
const LAYER_TITLE: &str = "trusted_tekton_tasks";

/// Why the catalog could not be loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// `skopeo` is not installed or not on `PATH`.
    #[error("skopeo not found. Please install skopeo.")]
    SkopeoMissing,
    /// `skopeo copy` ran but failed.
    #[error("failed to fetch trusted tasks data from {data_source}: {detail}")]
    FetchFailed {
        /// Artifact reference.
        data_source: String,
        /// Process stderr or spawn error.
        detail: String,
    },
    /// The scratch directory could not be created.
    #[error("failed to create scratch directory: {0}")]
    Scratch(#[from] std::io::Error),
    /// The copy produced no `manifest.json`.
    #[error("no manifest.json found in fetched data")]
    MissingManifest,
    /// `manifest.json` is not a valid image manifest.
    #[error("invalid manifest.json: {0}")]
    BadManifest(#[from] serde_json::Error),
    /// No layer carries the trusted tasks title.
    #[error("could not find trusted_tekton_tasks layer in manifest")]
    MissingLayer,
    /// The layer blob named in the manifest is absent.
    #[error("data layer {0} not found")]
    MissingBlob(String),
    /// A file could not be read.
    #[error("failed to read {path}: {detail}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        detail: String,
    },
    /// The catalog YAML does not parse.
    #[error("failed to parse trusted tasks data: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
struct ImageManifest {
    #[serde(default)]
    layers: Vec<ManifestLayer>,
}

#[derive(Debug, Deserialize)]
struct ManifestLayer {
    #[serde(default)]
    digest: String,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

/// Arguments for `skopeo` copying `data_source` into `dest`.
#[must_use]
pub fn skopeo_copy_args(data_source: &str, dest: &Path) -> Vec<String> {
    vec![
        "copy".to_string(),
        "--preserve-digests".to_string(),
        format!("docker://{data_source}"),
        format!("dir:{}", dest.display()),
    ]
}

/// Fetches and parses the trusted-tasks catalog.
///
/// # Errors
///
/// Returns a [`CatalogError`] when the artifact cannot be fetched, the
/// data layer is missing, or the YAML cannot be parsed.
pub fn load_ledger(
    runner: &dyn CommandRunner,
    fs: &dyn FileSystem,
    data_source: &str,
) -> Result<Ledger, CatalogError> {
    let scratch = tempfile::TempDir::new()?;
    let dest = scratch.path().join("data");

    tracing::info!("Fetching trusted tasks data from {data_source}...");
    let output = runner.run("skopeo", &skopeo_copy_args(data_source, &dest)).map_err(|e| {
        let not_found = e
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
        if not_found {
            CatalogError::SkopeoMissing
        } else {
            CatalogError::FetchFailed { data_source: data_source.to_string(), detail: e.to_string() }
        }
    })?;
    if !output.success() {
        return Err(CatalogError::FetchFailed {
            data_source: data_source.to_string(),
            detail: output.stderr.trim().to_string(),
        });
    }

    let manifest_path = dest.join("manifest.json");
    if !fs.exists(&manifest_path) {
        return Err(CatalogError::MissingManifest);
    }
    let manifest: ImageManifest = serde_json::from_str(&read(fs, &manifest_path)?)?;
    let blob = data_layer_blob(&manifest).ok_or(CatalogError::MissingLayer)?;

    let blob_path = dest.join(&blob);
    if !fs.exists(&blob_path) {
        return Err(CatalogError::MissingBlob(blob));
    }
    let ledger = Ledger::from_catalog_yaml(&read(fs, &blob_path)?, data_source)?;
    tracing::info!("Loaded {} trusted task entries", ledger.len());
    Ok(ledger)
}

/// Blob file name (digest hex) of the trusted tasks layer.
fn data_layer_blob(manifest: &ImageManifest) -> Option<String> {
    let layer = manifest.layers.iter().find(|layer| {
        layer.annotations.get(TITLE_ANNOTATION).is_some_and(|title| title.contains(LAYER_TITLE))
    })?;
    layer.digest.strip_prefix("sha256:").map(ToString::to_string)
}

fn read(fs: &dyn FileSystem, path: &Path) -> Result<String, CatalogError> {
    fs.read_to_string(path).map_err(|e| CatalogError::Read {
        path: path.display().to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod fake {
    use std::path::Path;

    use crate::ports::{CommandOutput, CommandRunner, PortError};

    /// Pretends to be skopeo by writing a fixed artifact into the `dir:` target.
    pub struct FakeSkopeo {
        pub manifest: Option<String>,
        pub blob: Option<(String, String)>,
        pub exit_code: i32,
    }

    impl FakeSkopeo {
        pub fn publishing(catalog: &str) -> Self {
            let manifest = r#"{"layers":[
                {"digest":"sha256:cfg","annotations":{"org.opencontainers.image.title":"rule_data.yml"}},
                {"digest":"sha256:d00d","annotations":{"org.opencontainers.image.title":"trusted_tekton_tasks.yml"}}
            ]}"#;
            Self {
                manifest: Some(manifest.to_string()),
                blob: Some(("d00d".to_string(), catalog.to_string())),
                exit_code: 0,
            }
        }
    }

    impl CommandRunner for FakeSkopeo {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, PortError> {
            assert_eq!(program, "skopeo");
            let dest = args.last().and_then(|a| a.strip_prefix("dir:")).expect("dir target");
            std::fs::create_dir_all(dest)?;
            if let Some(manifest) = &self.manifest {
                std::fs::write(Path::new(dest).join("manifest.json"), manifest)?;
            }
            if let Some((name, body)) = &self.blob {
                std::fs::write(Path::new(dest).join(name), body)?;
            }
            Ok(CommandOutput {
                exit_code: self.exit_code,
                stdout: String::new(),
                stderr: if self.exit_code == 0 { String::new() } else { "unauthorized".into() },
            })
        }
    }
}
