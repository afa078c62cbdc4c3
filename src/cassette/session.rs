//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::recorder::CassetteRecorder;
use crate::adapters::live::commands::LiveCommandRunner;
use crate::ports::CommandRunner;

/// Manages per-port `CassetteRecorder` instances for a recording session.
///
/// Each port gets its own recorder writing to `<port>.cassette.yaml` in the
/// session's output directory.
pub struct RecordingSession {
    /// Recorder for external command interactions.
    pub commands: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for filesystem interactions.
    pub fs: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for registry interactions.
    pub registry: Arc<Mutex<CassetteRecorder>>,
    /// Output directory containing all cassette files.
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Create a recording session writing into `output_dir`.
    ///
    /// The directory is created if needed. Existing cassettes in it are
    /// overwritten when the session finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, String> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            format!("Failed to create cassette directory {}: {e}", output_dir.display())
        })?;

        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let commit = commit_hash(&LiveCommandRunner);

        let make_recorder = |port: &str| -> Arc<Mutex<CassetteRecorder>> {
            let path = cassette_path(&output_dir, port);
            let name = format!("{timestamp}-{port}");
            Arc::new(Mutex::new(CassetteRecorder::new(path, &name, &commit)))
        };

        Ok(Self {
            commands: make_recorder("commands"),
            fs: make_recorder("fs"),
            registry: make_recorder("registry"),
            output_dir,
        })
    }

    /// Finish all recorders and write cassette files to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if an adapter still holds its recorder or a
    /// cassette file cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        fn finish_one(arc: Arc<Mutex<CassetteRecorder>>, port: &str) -> Result<(), String> {
            let recorder = Arc::try_unwrap(arc)
                .map_err(|_| format!("Recording adapter for {port} still has references"))?
                .into_inner()
                .map_err(|e| format!("Recorder lock for {port} poisoned: {e}"))?;
            recorder.finish().map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
            Ok(())
        }

        finish_one(self.commands, "commands")?;
        finish_one(self.fs, "fs")?;
        finish_one(self.registry, "registry")?;

        Ok(self.output_dir)
    }
}

/// Path of a port's cassette inside a session directory.
#[must_use]
pub fn cassette_path(dir: &Path, port: &str) -> PathBuf {
    dir.join(format!("{port}.cassette.yaml"))
}

/// Current git commit hash, or `"unknown"` when unavailable.
fn commit_hash(runner: &dyn CommandRunner) -> String {
    let args = ["rev-parse".to_string(), "HEAD".to_string()];
    match runner.run("git", &args) {
        Ok(output) if output.success() => output.stdout.trim().to_string(),
        _ => {
            tracing::warn!("Could not get git commit hash, using 'unknown'");
            "unknown".to_string()
        }
    }
}
