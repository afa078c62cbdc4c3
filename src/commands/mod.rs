//! Command dispatch and handlers.

pub mod lookup;
pub mod update;

use std::env;
use std::path::Path;

use crate::cassette::session::RecordingSession;
use crate::cli::Command;
use crate::config::Config;
use crate::context::ServiceContext;

/// Environment variable selecting a directory to record cassettes into.
pub const RECORD_ENV: &str = "TEKBUMP_RECORD";
/// Environment variable selecting a directory of cassettes to replay.
pub const REPLAY_ENV: &str = "TEKBUMP_REPLAY";

/// How a successful command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing left to do.
    Success,
    /// A dry run found changes that were not applied.
    ChangesPending,
}

/// Dispatch a parsed command to its handler.
///
/// When `TEKBUMP_RECORD` is set to a directory path, all port interactions
/// are recorded to per-port cassette files in that directory. When
/// `TEKBUMP_REPLAY` is set, they are served from such a directory instead.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<Status, String> {
    let config = Config::from_env()?;

    if let Ok(dir) = env::var(REPLAY_ENV) {
        let ctx = ServiceContext::replaying(Path::new(&dir))?;
        return dispatch_with_context(command, &ctx, &config);
    }

    let (ctx, session) = if let Ok(dir) = env::var(RECORD_ENV) {
        let (ctx, session) = ServiceContext::recording_at(dir, &config.registry)?;
        (ctx, Some(session))
    } else {
        (ServiceContext::live(&config.registry), None)
    };

    let result = dispatch_with_context(command, &ctx, &config);

    // Finish recording after command completes (even on error)
    if let Some(session) = session {
        // Drop context first to release Arc references
        drop(ctx);
        finish_recording(session)?;
    }

    result
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the command handler fails.
pub fn dispatch_with_context(
    command: &Command,
    ctx: &ServiceContext,
    config: &Config,
) -> Result<Status, String> {
    match command {
        Command::Update(args) => update::run(ctx, config, args),
        Command::Lookup(args) => lookup::run(ctx, config, args),
    }
}

/// Finish a recording session and print the output directory.
fn finish_recording(session: RecordingSession) -> Result<(), String> {
    let output_dir = session.finish()?;
    eprintln!("Recording saved to: {}", output_dir.display());
    Ok(())
}
