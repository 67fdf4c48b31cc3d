//! Parser for memcheck XML reports.
//!
//! The document is a `valgrindoutput` root holding zero or more `error`
//! records, each with a `kind`, an optional `what` (or leak-style `xwhat`)
//! and one or more `stack`s of `frame`s.

use roxmltree::{Document, Node};
use tracing::{debug, trace};

use super::model::{BackTrace, StackFrame};
use crate::error::{MemtriageError, Result};

/// Typed view over one element of the parsed report.
///
/// Every lookup is "first descendant with this tag name, or absent";
/// empty text counts as absent.
#[derive(Clone, Copy)]
struct Element<'a, 'input> {
    node: Node<'a, 'input>,
}

impl<'a, 'input> Element<'a, 'input> {
    fn new(node: Node<'a, 'input>) -> Self {
        Self { node }
    }

    fn first(&self, tag: &str) -> Option<Element<'a, 'input>> {
        self.node
            .descendants()
            .skip(1)
            .find(|n| n.is_element() && n.has_tag_name(tag))
            .map(Element::new)
    }

    /// Text of the first element reached by following `path`.
    fn text_at(&self, path: &[&str]) -> Option<String> {
        let mut current = *self;
        for tag in path {
            current = current.first(tag)?;
        }
        current
            .node
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    }

    fn field(&self, tag: &str) -> Option<String> {
        self.text_at(&[tag])
    }

    fn all(&self, tag: &'a str) -> impl Iterator<Item = Element<'a, 'input>> + 'a
    where
        'input: 'a,
    {
        self.node
            .descendants()
            .skip(1)
            .filter(move |n| n.is_element() && n.has_tag_name(tag))
            .map(Element::new)
    }
}

fn parse_frame(frame: Element<'_, '_>) -> StackFrame {
    StackFrame::new(
        frame.field("fn"),
        frame.field("file"),
        frame.field("line"),
        frame.field("obj"),
    )
}

fn parse_error(error: Element<'_, '_>, index: usize) -> Result<BackTrace> {
    let kind = error.field("kind").ok_or_else(|| {
        MemtriageError::MalformedReport(format!("error record {index} has no <kind>"))
    })?;
    let description = error
        .field("what")
        .or_else(|| error.text_at(&["xwhat", "text"]));
    let frames = error.all("frame").map(parse_frame);
    Ok(BackTrace::new(kind, description, frames))
}

/// Parse a memcheck XML report into backtraces, in document order.
///
/// Fails as a whole on non-well-formed input or a record without `kind`;
/// no partial results are returned.
pub fn parse_report(xml: &str) -> Result<Vec<BackTrace>> {
    let doc = Document::parse(xml).map_err(|e| MemtriageError::MalformedReport(e.to_string()))?;
    let root = Element::new(doc.root());

    let traces = root
        .all("error")
        .enumerate()
        .map(|(i, error)| parse_error(error, i))
        .collect::<Result<Vec<_>>>()?;

    debug!(records = traces.len(), "Parsed memcheck report");
    for bt in &traces {
        trace!(kind = %bt.kind, frames = bt.stack().len(), "Parsed error record");
    }
    Ok(traces)
}
