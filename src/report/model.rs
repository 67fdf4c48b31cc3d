//! Semantic model of a memcheck diagnostic.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Single entry in a memory error backtrace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Symbol name as reported by the tool (may still be mangled).
    pub function_name: Option<String>,
    pub source_file: Option<String>,
    /// Line number, kept as text.
    pub source_line: Option<String>,
    /// Library or executable containing the frame.
    pub binary_object: Option<String>,
}

impl StackFrame {
    pub fn new(
        function_name: Option<String>,
        source_file: Option<String>,
        source_line: Option<String>,
        binary_object: Option<String>,
    ) -> Self {
        Self {
            function_name,
            source_file,
            source_line,
            binary_object,
        }
    }

    /// Frames without a function name carry no triage value.
    pub fn is_anonymous(&self) -> bool {
        self.function_name.is_none()
    }

    /// `file:line` when both are known.
    pub fn location(&self) -> Option<String> {
        match (&self.source_file, &self.source_line) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        }
    }

    /// Function name, demangled when asked and recognised.
    pub fn display_name(&self, demangle: bool) -> Cow<'_, str> {
        let name = self.function_name.as_deref().unwrap_or_default();
        if demangle {
            crate::demangle::readable(name)
        } else {
            Cow::Borrowed(name)
        }
    }

    fn write_line(&self, f: &mut impl fmt::Write, demangle: bool) -> fmt::Result {
        write!(f, "\t{}", self.display_name(demangle))?;
        if let Some(loc) = self.location() {
            write!(f, " ({loc})")?;
        }
        Ok(())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_line(f, false)
    }
}

/// One memcheck error record.
///
/// Deserialization goes through [`BackTrace::new`], so anonymous frames are
/// dropped there as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawBackTrace")]
pub struct BackTrace {
    /// Memcheck classification tag, e.g. `Leak_DefinitelyLost`.
    pub kind: String,
    pub description: Option<String>,
    stack: Vec<StackFrame>,
}

impl BackTrace {
    /// Build a backtrace, dropping anonymous frames and keeping report order.
    pub fn new(
        kind: impl Into<String>,
        description: Option<String>,
        frames: impl IntoIterator<Item = StackFrame>,
    ) -> Self {
        Self {
            kind: kind.into(),
            description,
            stack: frames.into_iter().filter(|f| !f.is_anonymous()).collect(),
        }
    }

    /// Outermost-first call chain without anonymous frames.
    pub fn stack(&self) -> &[StackFrame] {
        &self.stack
    }

    /// Headline printed above the stack.
    pub fn headline(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.kind)
    }

    /// Headline and frames, with mangled frame names demangled when asked.
    pub fn render(&self, demangle: bool) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(&mut out, demangle);
        out
    }

    fn write_to(&self, f: &mut impl fmt::Write, demangle: bool) -> fmt::Result {
        writeln!(f, "{}", self.headline())?;
        for frame in &self.stack {
            frame.write_line(&mut *f, demangle)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for BackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, false)
    }
}

#[derive(Deserialize)]
struct RawBackTrace {
    kind: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stack: Vec<StackFrame>,
}

impl From<RawBackTrace> for BackTrace {
    fn from(raw: RawBackTrace) -> Self {
        BackTrace::new(raw.kind, raw.description, raw.stack)
    }
}
