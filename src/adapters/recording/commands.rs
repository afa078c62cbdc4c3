//! Recording adapter for the `CommandRunner` port.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::{CommandOutput, CommandRunner, PortError};

/// Records command runs while delegating to an inner implementation.
pub struct RecordingCommandRunner {
    inner: Box<dyn CommandRunner>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingCommandRunner {
    /// Creates a new recording runner wrapping the given implementation.
    pub fn new(inner: Box<dyn CommandRunner>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

#[derive(Serialize)]
struct RunInput<'a> {
    program: &'a str,
    args: &'a [String],
}

impl CommandRunner for RecordingCommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, PortError> {
        let result = self.inner.run(program, args);
        let input = RunInput { program, args };
        record_result(&self.recorder, "commands", "run", &input, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::commands::LiveCommandRunner;
    use crate::adapters::recording::test_support::finish;

    #[test]
    fn records_run_interaction() {
        let dir = tempfile::tempdir().unwrap();
        let cassette_path = dir.path().join("commands.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(&cassette_path, "test", "abc")));

        {
            let runner =
                RecordingCommandRunner::new(Box::new(LiveCommandRunner), Arc::clone(&recorder));
            let result = runner.run("echo", &["hello".to_string()]);
            assert!(result.is_ok());
        }

        let cassette = finish(recorder, &cassette_path);
        let interaction = &cassette.interactions[0];
        assert_eq!(interaction.port, "commands");
        assert_eq!(interaction.input["program"], "echo");
        assert_eq!(interaction.input["args"][0], "hello");
        assert_eq!(interaction.output["ok"]["stdout"], "hello\n");
    }
}
