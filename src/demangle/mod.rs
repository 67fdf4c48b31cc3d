//! Demangling of C++ (Itanium) frame names.
//!
//! Memcheck normally demangles symbols itself, but `--demangle=no` runs and
//! some stripped libraries leave raw `_Z...` names in the report.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

// Itanium (GCC/Clang) ABI: _Z...
static RE_ITA_MANGLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^_Z[a-zA-Z0-9_][a-zA-Z0-9_.$]*$"#).expect("valid itanium mangled regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlavor {
    Itanium,
    Unknown,
}

pub fn detect_flavor(s: &str) -> SymbolFlavor {
    if RE_ITA_MANGLED.is_match(s) {
        SymbolFlavor::Itanium
    } else {
        SymbolFlavor::Unknown
    }
}

/// Attempt to demangle a single symbol. Returns None when not recognized.
pub fn demangle_one(s: &str) -> Option<String> {
    if detect_flavor(s) != SymbolFlavor::Itanium {
        return None;
    }
    let sym = cpp_demangle::Symbol::new(s).ok()?;
    Some(sym.to_string())
}

/// Demangled form when `s` is a mangled symbol, `s` itself otherwise.
pub fn readable(s: &str) -> Cow<'_, str> {
    match demangle_one(s) {
        Some(out) => Cow::Owned(out),
        None => Cow::Borrowed(s),
    }
}
