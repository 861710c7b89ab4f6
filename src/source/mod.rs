use std::fmt;
use std::path::Path;
use std::rc::Rc;

pub mod source_map;
pub use source_map::SourceMap;

/// Byte range within one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

/// Where a token came from. Tokens of an imported file keep pointing at that
/// file after they are spliced into the importer's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Rc<Path>,
    pub span: Span,
    /// 1-based.
    pub line: usize,
    /// 1-based.
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.col)
    }
}
