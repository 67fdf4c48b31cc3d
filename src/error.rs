//! Error types for the memtriage tooling.
//!
//! This module provides structured error handling using thiserror. Setup
//! failures, malformed reports and scaffolding problems are all fatal for the
//! current invocation; reportable leaks are a verdict, not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for memtriage operations.
#[derive(Debug, Error)]
pub enum MemtriageError {
    /// Target executable is missing or lacks an execute bit
    #[error("executable {} NOT FOUND", path.display())]
    ExecutableNotFound { path: PathBuf },

    /// Instrumentation tool is not on the search path
    #[error("{tool} NOT FOUND")]
    ToolNotFound { tool: String },

    /// The captured report is not the expected XML document
    #[error("Malformed report: {0}")]
    MalformedReport(String),

    /// The instrumentation tool could not be launched
    #[error("Instrumentation failed: {0}")]
    Instrumentation(String),

    /// Configuration file unreadable or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Test scaffolding failures
    #[error("Scaffold error: {0}")]
    Scaffold(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MemtriageError {
    /// True for failures detected before the instrumentation tool runs.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            MemtriageError::ExecutableNotFound { .. } | MemtriageError::ToolNotFound { .. }
        )
    }
}

/// Result type alias for memtriage operations
pub type Result<T> = std::result::Result<T, MemtriageError>;
