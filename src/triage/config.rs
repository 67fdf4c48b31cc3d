//! Configuration for the triage pipeline.
//!
//! Provides centralized configuration for all triage components with
//! defaults matching the libfbi/vigra test-suite conventions. Every section
//! deserializes with defaults, so a JSON file only needs the keys it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MemtriageError, Result};

/// Master configuration for the triage pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Marker tokens that attribute frames to project test code.
    pub markers: MarkerConfig,
    /// Instrumentation tool invocation.
    pub memcheck: MemcheckConfig,
    /// Boilerplate lines removed before parsing.
    pub noise: NoiseConfig,
}

impl TriageConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| MemtriageError::Config(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MemtriageError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

/// Heuristic attribution of stack frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Substrings of function names identifying the project's library code.
    pub project_markers: Vec<String>,
    /// Substrings of function names identifying the test framework's
    /// suite-running code.
    pub test_framework_markers: Vec<String>,
    /// Substring of source file names identifying generated test sources.
    pub test_file_suffix: String,
    /// Exact `kind` tag memcheck uses for definitely lost blocks.
    pub definitely_lost_kind: String,
    /// Also match mangled function names in demangled form.
    pub demangle: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            project_markers: vec!["vigra".to_string()],
            test_framework_markers: vec!["TestSuite".to_string()],
            test_file_suffix: "-test.cpp".to_string(),
            definitely_lost_kind: "Leak_DefinitelyLost".to_string(),
            demangle: true,
        }
    }
}

/// Memcheck command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemcheckConfig {
    /// Executable name looked up on the search path (default: valgrind).
    pub tool: String,
    /// Value of `--leak-check` (default: full).
    pub leak_check: String,
    /// File descriptor the XML stream is routed to (default: 3).
    pub xml_fd: i32,
    /// Backtrace depth cap (default: 50).
    pub num_callers: u32,
    /// Suppress diagnostics from children forked by the target (default: true).
    pub child_silent_after_fork: bool,
    /// Extra arguments placed before the target path.
    pub extra_args: Vec<String>,
}

impl Default for MemcheckConfig {
    fn default() -> Self {
        Self {
            tool: "valgrind".to_string(),
            leak_check: "full".to_string(),
            xml_fd: 3,
            num_callers: 50,
            child_silent_after_fork: true,
            extra_args: Vec::new(),
        }
    }
}

impl MemcheckConfig {
    /// Tool arguments preceding the target executable.
    pub fn args(&self) -> Vec<String> {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let mut args = vec![
            "--tool=memcheck".to_string(),
            format!(
                "--child-silent-after-fork={}",
                yes_no(self.child_silent_after_fork)
            ),
            format!("--leak-check={}", self.leak_check),
            "--xml=yes".to_string(),
            format!("--xml-fd={}", self.xml_fd),
            format!("--num-callers={}", self.num_callers),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Line-prefix noise filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub line_prefixes: Vec<String>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            line_prefixes: vec![
                "<unknown program name>".to_string(),
                "profiling:".to_string(),
            ],
        }
    }
}
