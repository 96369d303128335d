//! Source locations.
//!
//! A [`Span`] carries both byte offsets (for slicing the source text) and
//! 1-based line/column positions (for rendering diagnostics). Columns count
//! Unicode scalar values, not bytes.

use core::fmt;

/// Index of a source file registered with the compiler context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(pub u32);

/// A line/column position. Both are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const START: Pos = Pos { line: 1, col: 1 };

    pub fn new(line: u32, col: u32) -> Self {
        Pos { line, col }
    }
}

impl Default for Pos {
    fn default() -> Self {
        Pos::START
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A half-open source range `[start, end)`.
///
/// `front` is the position of the first character, `back` the position just
/// after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
    pub front: Pos,
    pub back: Pos,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32, front: Pos, back: Pos) -> Self {
        Span {
            file,
            start,
            end,
            front,
            back,
        }
    }

    /// An empty span sitting at the end of `self`.
    pub fn end_point(self) -> Span {
        Span {
            start: self.end,
            front: self.back,
            ..self
        }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(self.file, other.file);
        let (start, front) = if other.start < self.start {
            (other.start, other.front)
        } else {
            (self.start, self.front)
        };
        let (end, back) = if other.end > self.end {
            (other.end, other.back)
        } else {
            (self.end, self.back)
        };
        Span {
            file: self.file,
            start,
            end,
            front,
            back,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The slice of `source` covered by this span.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or_default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.front, self.back)
    }
}
