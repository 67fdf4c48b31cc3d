//! Integration tests for triage functionality.
//!
//! Parsing, classification and the runner are exercised together, from raw
//! report text or a fake instrumentation tool through to the verdict.

mod pipeline;
