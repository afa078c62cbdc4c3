//! Replaying adapter for the `FileSystem` port.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::extract_result;
use crate::cassette::replayer::CassetteReplayer;
use crate::ports::{FileSystem, PortError};

/// Replays recorded filesystem operations from a cassette.
pub struct ReplayingFileSystem {
    replayer: Mutex<CassetteReplayer>,
}

impl ReplayingFileSystem {
    /// Creates a new replaying filesystem from a cassette replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        Self { replayer: Mutex::new(replayer) }
    }

    fn next_output(&self, method: &str) -> serde_json::Value {
        let mut replayer = self.replayer.lock().expect("replayer lock poisoned");
        replayer.next_interaction("fs", method).output.clone()
    }
}

impl FileSystem for ReplayingFileSystem {
    fn read_to_string(&self, _path: &Path) -> Result<String, PortError> {
        extract_result(&self.next_output("read_to_string"), "fs::read_to_string")
    }

    fn write(&self, _path: &Path, _contents: &str) -> Result<(), PortError> {
        let output = self.next_output("write");
        if let Some(err) = output.get("err") {
            let msg = err.as_str().unwrap_or("unknown error").to_string();
            return Err(msg.into());
        }
        Ok(())
    }

    fn exists(&self, _path: &Path) -> bool {
        self.next_output("exists").as_bool().expect("fs::exists: expected boolean output")
    }

    fn glob(&self, _pattern: &str) -> Result<Vec<PathBuf>, PortError> {
        extract_result(&self.next_output("glob"), "fs::glob")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::replaying::test_support::replayer;
    use serde_json::json;

    #[test]
    fn replaying_fs_read_to_string() {
        let fs = ReplayingFileSystem::new(replayer(vec![(
            "fs",
            "read_to_string",
            json!({"path": "/tmp/test.txt"}),
            json!({"ok": "file contents"}),
        )]));
        assert_eq!(fs.read_to_string(Path::new("/tmp/test.txt")).unwrap(), "file contents");
    }

    #[test]
    fn replaying_fs_read_to_string_error() {
        let fs = ReplayingFileSystem::new(replayer(vec![(
            "fs",
            "read_to_string",
            json!({"path": "/missing"}),
            json!({"err": "file not found"}),
        )]));
        let result = fs.read_to_string(Path::new("/missing"));
        assert!(result.unwrap_err().to_string().contains("file not found"));
    }

    #[test]
    fn replaying_fs_exists_write_and_glob() {
        let fs = ReplayingFileSystem::new(replayer(vec![
            ("fs", "exists", json!({"path": "/p.yaml"}), json!(true)),
            ("fs", "write", json!({"path": "/p.yaml", "contents": "x"}), json!({"ok": null})),
            ("fs", "glob", json!({"pattern": "*.yaml"}), json!({"ok": ["a.yaml", "b.yaml"]})),
        ]));
        assert!(fs.exists(Path::new("/p.yaml")));
        assert!(fs.write(Path::new("/p.yaml"), "x").is_ok());
        assert_eq!(
            fs.glob("*.yaml").unwrap(),
            [PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]
        );
    }
}
