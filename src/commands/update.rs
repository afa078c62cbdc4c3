//! `tekbump update` command.

use std::io::IsTerminal;
use std::path::PathBuf;

use crate::catalog;
use crate::cli::UpdateArgs;
use crate::config::Config;
use crate::context::ServiceContext;
use crate::pipeline::{self, diff::unified_diff, AnalysisResult};
use crate::report;

use super::Status;

/// Execute the `update` command.
///
/// Pipelines are read and written through the context's filesystem port;
/// the trusted-tasks catalog is fetched through its command runner.
///
/// # Errors
///
/// Returns an error string if no pipeline files are found, a file is
/// missing or unreadable, or the catalog cannot be loaded.
pub fn run(ctx: &ServiceContext, config: &Config, args: &UpdateArgs) -> Result<Status, String> {
    let files = pipeline_files(ctx, config, args)?;

    let data_source = args.data_source.as_deref().unwrap_or(&config.data_source);
    let ledger = catalog::load_ledger(ctx.runner.as_ref(), ctx.fs.as_ref(), data_source)
        .map_err(|e| format!("Error: {e}"))?;

    let mut results: Vec<(String, AnalysisResult)> = Vec::with_capacity(files.len());
    let mut contents = Vec::with_capacity(files.len());
    for path in &files {
        let label = path.display().to_string();
        let content = ctx
            .fs
            .read_to_string(path)
            .map_err(|e| format!("Failed to read {label}: {e}"))?;
        let result = pipeline::analyze(&label, &content, &ledger, args.upgrade_versions);
        results.push((label, result));
        contents.push(content);
    }

    if args.json {
        println!("{}", report::update_json(&results)?);
    } else if !args.quiet {
        print!("{}", report::update_summary(&results, args.dry_run));
    }

    let color = std::io::stdout().is_terminal();
    let mut pending = false;
    for ((path, (label, result)), content) in files.iter().zip(&results).zip(&contents) {
        if result.updates.is_empty() {
            continue;
        }
        let updated = pipeline::apply_updates(content, &result.updates);

        if args.diff {
            print!("{}", unified_diff(content, &updated, label, color));
        }

        if args.dry_run {
            pending = true;
        } else {
            ctx.fs.write(path, &updated).map_err(|e| format!("Failed to write {label}: {e}"))?;
            if !args.quiet && !args.json {
                println!("Updated {label}");
            }
        }
    }

    Ok(if pending { Status::ChangesPending } else { Status::Success })
}

/// Files named on the command line, or the configured glob's matches.
fn pipeline_files(
    ctx: &ServiceContext,
    config: &Config,
    args: &UpdateArgs,
) -> Result<Vec<PathBuf>, String> {
    if args.files.is_empty() {
        let mut found = ctx
            .fs
            .glob(&config.pipeline_glob)
            .map_err(|e| format!("Invalid pipeline pattern {}: {e}", config.pipeline_glob))?;
        if found.is_empty() {
            return Err(format!(
                "No pipeline files specified and no {} found",
                config.pipeline_glob
            ));
        }
        found.sort();
        return Ok(found);
    }

    for path in &args.files {
        if !ctx.fs.exists(path) {
            return Err(format!("Error: File not found: {}", path.display()));
        }
    }
    Ok(args.files.clone())
}
