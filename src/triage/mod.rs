//! Memory-error triage for test executables.
//!
//! This module runs memcheck against a single executable, classifies the
//! reported errors and reduces them to a pass/fail verdict.

pub mod classify;
pub mod config;
pub mod runner;

pub use classify::Classifier;
pub use config::{MarkerConfig, MemcheckConfig, NoiseConfig, TriageConfig};
pub use runner::{Phase, Runner, Verdict, DIVIDER, EXIT_FAILURE, EXIT_PASS};
