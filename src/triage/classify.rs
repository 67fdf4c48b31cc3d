//! Classification of memcheck diagnostics.
//!
//! A backtrace is reportable when memcheck is certain the memory is lost
//! and at least one frame belongs to the project's own test code.

use aho_corasick::AhoCorasick;
use tracing::trace;

use super::config::MarkerConfig;
use crate::demangle;
use crate::error::{MemtriageError, Result};
use crate::report::{BackTrace, StackFrame};

/// Predicates over [`BackTrace`], built once from a [`MarkerConfig`].
#[derive(Debug, Clone)]
pub struct Classifier {
    definitely_lost_kind: String,
    /// Project and test-framework markers, matched against function names.
    function_markers: Option<AhoCorasick>,
    test_file_suffix: Option<String>,
    demangle: bool,
}

impl Classifier {
    /// Build the matcher. Empty marker strings are ignored.
    pub fn new(config: &MarkerConfig) -> Result<Self> {
        let markers: Vec<&str> = config
            .project_markers
            .iter()
            .chain(config.test_framework_markers.iter())
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect();
        let function_markers = if markers.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&markers).map_err(|e| MemtriageError::Config(e.to_string()))?)
        };
        let test_file_suffix = Some(config.test_file_suffix.clone()).filter(|s| !s.is_empty());

        Ok(Self {
            definitely_lost_kind: config.definitely_lost_kind.clone(),
            function_markers,
            test_file_suffix,
            demangle: config.demangle,
        })
    }

    /// Exact match on the "definitely lost" kind tag.
    pub fn is_definitely_lost(&self, bt: &BackTrace) -> bool {
        bt.kind == self.definitely_lost_kind
    }

    /// Any frame anywhere in the stack names project or test-suite code.
    pub fn is_attributable_to_project_tests(&self, bt: &BackTrace) -> bool {
        bt.stack().iter().any(|frame| self.frame_matches(frame))
    }

    pub fn is_reportable(&self, bt: &BackTrace) -> bool {
        self.is_definitely_lost(bt) && self.is_attributable_to_project_tests(bt)
    }

    /// Keep reportable backtraces, preserving their order.
    pub fn filter_reportable(&self, traces: Vec<BackTrace>) -> Vec<BackTrace> {
        traces
            .into_iter()
            .filter(|bt| {
                let keep = self.is_reportable(bt);
                if !keep {
                    trace!(kind = %bt.kind, "Dropping non-reportable error");
                }
                keep
            })
            .collect()
    }

    fn frame_matches(&self, frame: &StackFrame) -> bool {
        if let (Some(func), Some(ac)) = (&frame.function_name, &self.function_markers) {
            if ac.is_match(func.as_str()) {
                return true;
            }
            if self.demangle {
                if let Some(readable) = demangle::demangle_one(func) {
                    if ac.is_match(readable.as_str()) {
                        return true;
                    }
                }
            }
        }
        match (&frame.source_file, &self.test_file_suffix) {
            (Some(file), Some(suffix)) => file.contains(suffix.as_str()),
            _ => false,
        }
    }
}
