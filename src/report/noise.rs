//! Line-level removal of boilerplate that memcheck and instrumented
//! binaries interleave with the XML stream.

use tracing::trace;

use crate::triage::config::NoiseConfig;

/// True when `line` starts with one of the configured noise prefixes.
pub fn is_noise(line: &str, config: &NoiseConfig) -> bool {
    config
        .line_prefixes
        .iter()
        .any(|prefix| line.starts_with(prefix.as_str()))
}

/// Drop noise lines, keeping every other line (and its terminator) as is.
pub fn strip_noise(text: &str, config: &NoiseConfig) -> String {
    let mut out = String::with_capacity(text.len());
    let mut dropped = 0usize;
    for line in text.split_inclusive('\n') {
        if is_noise(line, config) {
            dropped += 1;
            continue;
        }
        out.push_str(line);
    }
    if dropped > 0 {
        trace!(dropped, "Removed noise lines from report");
    }
    out
}
