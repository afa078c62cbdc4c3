//! Service context bundling all port trait objects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::live::auth;
use crate::adapters::live::commands::LiveCommandRunner;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::live::registry::LiveRegistryClient;
use crate::adapters::recording::{
    RecordingCommandRunner, RecordingFileSystem, RecordingRegistryClient,
};
use crate::adapters::replaying::{
    ReplayingCommandRunner, ReplayingFileSystem, ReplayingRegistryClient,
};
use crate::cassette::config::CassetteConfig;
use crate::cassette::session::RecordingSession;
use crate::config::RegistrySettings;
use crate::ports::{CommandOutput, CommandRunner, FileSystem, PortError, RegistryClient, RegistryFuture};

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Constructors
/// wire up different adapter implementations (live, replaying, recording).
pub struct ServiceContext {
    /// Runs external programs (`skopeo`).
    pub runner: Box<dyn CommandRunner>,
    /// Filesystem for pipeline and catalog files.
    pub fs: Box<dyn FileSystem>,
    /// Container registry queries.
    pub registry: Box<dyn RegistryClient>,
    /// Where registry credentials came from, for display.
    pub auth_source: String,
}

impl ServiceContext {
    /// Creates a live context with real adapters.
    ///
    /// Registry credentials are discovered from the environment here.
    #[must_use]
    pub fn live(settings: &RegistrySettings) -> Self {
        let found = auth::discover(&settings.host);
        Self {
            runner: Box::new(LiveCommandRunner),
            fs: Box::new(LiveFileSystem),
            registry: Box::new(LiveRegistryClient::new(settings.clone(), found.credential)),
            auth_source: found.source,
        }
    }

    /// Creates a recording context that wraps the live adapters.
    ///
    /// Interactions are captured into per-port cassettes under `dir`; call
    /// [`RecordingSession::finish`] after dropping the context to write them.
    /// This is the developer-only mechanism behind `TEKBUMP_RECORD`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    pub fn recording_at(
        dir: impl Into<PathBuf>,
        settings: &RegistrySettings,
    ) -> Result<(Self, RecordingSession), String> {
        let session = RecordingSession::new(dir)?;
        let live = Self::live(settings);
        let ctx = Self {
            runner: Box::new(RecordingCommandRunner::new(live.runner, Arc::clone(&session.commands))),
            fs: Box::new(RecordingFileSystem::new(live.fs, Arc::clone(&session.fs))),
            registry: Box::new(RecordingRegistryClient::new(
                live.registry,
                Arc::clone(&session.registry),
            )),
            auth_source: live.auth_source,
        };
        Ok((ctx, session))
    }

    /// Creates a replaying context from a directory written by a recording
    /// session.
    ///
    /// # Errors
    ///
    /// Returns an error if a cassette file cannot be read or parsed.
    pub fn replaying(dir: &Path) -> Result<Self, String> {
        Self::replaying_from(&CassetteConfig::from_dir(dir))
    }

    /// Creates a replaying context from per-port cassette files.
    ///
    /// Ports without a configured cassette file use a panicking adapter that
    /// fails with a clear message when called.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn replaying_from(config: &CassetteConfig) -> Result<Self, String> {
        let replayers = config.load_all()?;

        Ok(Self {
            runner: match replayers.commands {
                Some(r) => Box::new(ReplayingCommandRunner::new(r)),
                None => Box::new(PanickingCommandRunner),
            },
            fs: match replayers.fs {
                Some(r) => Box::new(ReplayingFileSystem::new(r)),
                None => Box::new(PanickingFileSystem),
            },
            registry: match replayers.registry {
                Some(r) => Box::new(ReplayingRegistryClient::new(r)),
                None => Box::new(PanickingRegistryClient),
            },
            auth_source: "cassette replay".to_string(),
        })
    }
}

// --- Panicking adapters for unspecified ports ---

struct PanickingCommandRunner;
impl CommandRunner for PanickingCommandRunner {
    fn run(&self, _program: &str, _args: &[String]) -> Result<CommandOutput, PortError> {
        panic!("CommandRunner port not configured in CassetteConfig: no cassette loaded for commands");
    }
}

struct PanickingFileSystem;
impl FileSystem for PanickingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, PortError> {
        panic!("FileSystem port not configured in CassetteConfig: no cassette loaded for fs");
    }
    fn write(&self, _path: &Path, _contents: &str) -> Result<(), PortError> {
        panic!("FileSystem port not configured in CassetteConfig: no cassette loaded for fs");
    }
    fn exists(&self, _path: &Path) -> bool {
        panic!("FileSystem port not configured in CassetteConfig: no cassette loaded for fs");
    }
    fn glob(&self, _pattern: &str) -> Result<Vec<PathBuf>, PortError> {
        panic!("FileSystem port not configured in CassetteConfig: no cassette loaded for fs");
    }
}

struct PanickingRegistryClient;
impl RegistryClient for PanickingRegistryClient {
    fn list_tags(&self, _repository: &str) -> RegistryFuture<'_, Vec<String>> {
        panic!("RegistryClient port not configured in CassetteConfig: no cassette loaded for registry");
    }
    fn manifest_digest(&self, _repository: &str, _tag: &str) -> RegistryFuture<'_, Option<String>> {
        panic!("RegistryClient port not configured in CassetteConfig: no cassette loaded for registry");
    }
}
