//! Live filesystem adapter using `std::fs` and `glob`.

use std::path::{Path, PathBuf};

use crate::ports::filesystem::FileSystem;
use crate::ports::PortError;

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PortError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), PortError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, PortError> {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/pipeline.yaml");
        LiveFileSystem.write(&path, "kind: Pipeline\n").unwrap();
        assert!(LiveFileSystem.exists(&path));
        assert_eq!(LiveFileSystem.read_to_string(&path).unwrap(), "kind: Pipeline\n");
    }

    #[test]
    fn glob_returns_sorted_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.yaml", "a.yaml", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.yaml", dir.path().display());
        let found = LiveFileSystem.glob(&pattern).unwrap();
        let names: Vec<String> =
            found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, ["a.yaml", "b.yaml"]);
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(LiveFileSystem.glob("[").is_err());
    }
}
