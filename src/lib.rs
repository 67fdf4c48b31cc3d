//! Developer tooling for a C++ unit-test suite.
//!
//! The `triage` binary runs memcheck against a test executable and fails
//! only on definitely-lost leaks that implicate the project's test code.
//! The `create-test` binary scaffolds new test sources.

/// C++ symbol demangling
pub mod demangle;
/// Error types
pub mod error;
/// Tracing setup
pub mod logging;
/// Memcheck report model, parser and noise filter
pub mod report;
/// Test source scaffolding
pub mod scaffold;
/// Classification and orchestration
pub mod triage;

pub use error::{MemtriageError, Result};
