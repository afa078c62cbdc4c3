//! Live command runner using `std::process::Command`.

use std::process::Command;

use crate::ports::commands::{CommandOutput, CommandRunner};
use crate::ports::PortError;

/// Live runner that spawns real processes.
pub struct LiveCommandRunner;

impl CommandRunner for LiveCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, PortError> {
        tracing::debug!(program, ?args, "spawning");
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
