//! Shared test utilities for fake instrumentation tools and targets.
//!
//! This module consolidates the helpers that build a throwaway `PATH`
//! directory holding a scripted stand-in for valgrind.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

/// Creates a temporary file with the given content.
///
/// The file will be automatically cleaned up when the returned
/// `NamedTempFile` is dropped.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file
}

/// Writes `content` to `path` and marks it executable.
pub fn write_executable(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    std::fs::write(path, content).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A directory holding a fake `valgrind` and a dummy test executable.
pub struct FakeMemcheck {
    pub dir: TempDir,
}

impl FakeMemcheck {
    /// Fake tool that records its arguments and writes `xml` to fd 3.
    pub fn with_report(xml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args.txt");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\ncat <<'MEMCHECK_XML' >&3\n{}\nMEMCHECK_XML\nexit 0\n",
            args_file.display(),
            xml.trim_end()
        );
        write_executable(&dir.path().join("valgrind"), &script);
        write_executable(&dir.path().join("leaky-test"), "#!/bin/sh\nexit 0\n");
        Self { dir }
    }

    /// Directory with only a dummy target and no tool.
    pub fn without_tool() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_executable(&dir.path().join("leaky-test"), "#!/bin/sh\nexit 0\n");
        Self { dir }
    }

    pub fn target(&self) -> PathBuf {
        self.dir.path().join("leaky-test")
    }

    /// `PATH` with the fake tool first, followed by the system directories
    /// the script itself needs.
    pub fn search_path(&self) -> OsString {
        std::env::join_paths([
            self.dir.path().to_path_buf(),
            PathBuf::from("/bin"),
            PathBuf::from("/usr/bin"),
        ])
        .unwrap()
    }

    /// Arguments the fake tool was invoked with, one per entry.
    pub fn recorded_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("args.txt"))
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temp_file() {
        let temp_file = create_temp_file(b"<valgrindoutput/>");
        let read_content = std::fs::read(temp_file.path()).unwrap();
        assert_eq!(read_content, b"<valgrindoutput/>");
    }

    #[test]
    fn test_fake_layout() {
        let fake = FakeMemcheck::with_report("<valgrindoutput/>");
        assert!(fake.dir.path().join("valgrind").exists());
        assert!(fake.target().exists());
        assert!(!FakeMemcheck::without_tool()
            .dir
            .path()
            .join("valgrind")
            .exists());
    }
}
