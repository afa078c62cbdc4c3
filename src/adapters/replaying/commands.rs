//! Replaying adapter for the `CommandRunner` port.

use std::sync::Mutex;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{CommandOutput, CommandRunner, PortError};

/// Replays recorded command results from a cassette.
pub struct ReplayingCommandRunner {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingCommandRunner {
    /// Creates a new replaying runner from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }
}

impl CommandRunner for ReplayingCommandRunner {
    fn run(&self, _program: &str, _args: &[String]) -> Result<CommandOutput, PortError> {
        let output = {
            let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
            let interaction = replayer.next_interaction("commands", "run");
            interaction.output.clone()
        };
        extract_result(&output, "commands::run")
    }
}
