//! Command runner port for invoking external tools such as `skopeo`.

use serde::{Deserialize, Serialize};

use super::PortError;

/// The output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// The exit code of the process (`-1` when killed by a signal).
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the process exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
///
/// Arguments are passed through verbatim, without a shell in between.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args` and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned (for example when it
    /// is not installed).
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, PortError>;
}
