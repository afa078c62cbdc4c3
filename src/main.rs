//! Binary entrypoint for the `tekbump` CLI.

use std::process::ExitCode;

use tekbump::Status;

fn main() -> ExitCode {
    // Recording and replay are handled in commands::dispatch via
    // TEKBUMP_RECORD=<dir> and TEKBUMP_REPLAY=<dir>.
    match tekbump::run(std::env::args()) {
        Ok(Status::Success) => ExitCode::SUCCESS,
        Ok(Status::ChangesPending) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
