//! Memcheck report handling: the diagnostic model, the XML parser and the
//! line-level noise filter applied before parsing.

pub mod model;
pub mod noise;
pub mod parser;

pub use model::{BackTrace, StackFrame};
pub use noise::strip_noise;
pub use parser::parse_report;
