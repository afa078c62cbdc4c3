//! `tekbump lookup` command.

use crate::cli::{LookupArgs, OutputFormat};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::ec_log::parse_ec_log;
use crate::lookup::lookup_all;
use crate::report;

use super::Status;

/// Execute the `lookup` command.
///
/// Progress goes to stderr so that stdout carries only the report.
///
/// # Errors
///
/// Returns an error string if the log cannot be read, the async runtime
/// cannot start, or the report cannot be serialized.
pub fn run(ctx: &ServiceContext, config: &Config, args: &LookupArgs) -> Result<Status, String> {
    let path = &args.log_file;
    if !ctx.fs.exists(path) {
        return Err(format!("Error: File not found: {}", path.display()));
    }
    let content = ctx
        .fs
        .read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;

    let findings = parse_ec_log(&content);
    if findings.is_empty() {
        eprintln!("No outdated tasks found in log file");
        return Ok(Status::Success);
    }

    eprintln!("Found {} task(s) to look up", findings.len());
    eprintln!("Registry: {}", config.registry.bundle_prefix());
    eprintln!("Auth: {}", ctx.auth_source);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let results =
        runtime.block_on(lookup_all(ctx.registry.as_ref(), &config.registry, findings));

    match args.output {
        OutputFormat::Json => println!("{}", report::lookup_json(&results)?),
        OutputFormat::Summary => print!("{}", report::lookup_summary(&results)),
    }
    Ok(Status::Success)
}
