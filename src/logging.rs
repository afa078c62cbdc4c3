//! Diagnostic logging to stderr.
//!
//! Output on stdout is reserved for reports, diffs and JSON; everything
//! else goes through `tracing` to stderr.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Picks the default level from the `--verbose` / `--debug` flags.
#[must_use]
pub fn level_for(verbose: bool, debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else if verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over the flag-derived level.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(verbose: bool, debug: bool) {
    let default = level_for(verbose, debug).as_str().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
