//! Core library entry for the `tekbump` CLI.
//!
//! `tekbump update` rewrites Tekton pipeline task bundle references to the
//! digests the Konflux trusted-tasks catalog currently trusts.
//! `tekbump lookup` reads an Enterprise Contract log and resolves each
//! outdated or untrusted task against the live registry.

pub mod adapters;
pub mod bundle;
pub mod cassette;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod ec_log;
pub mod ledger;
pub mod logging;
pub mod lookup;
pub mod pipeline;
pub mod ports;
pub mod report;
pub mod resolve;
pub mod version;

use clap::error::ErrorKind;
use clap::Parser;

pub use commands::Status;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<Status, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return Ok(Status::Success);
        }
        Err(err) => return Err(err.to_string()),
    };
    logging::init(cli.verbose, cli.debug);
    commands::dispatch(&cli.command)
}
