//! Source locations attached to syntax nodes, bound nodes and diagnostics.

use std::fmt;

/// A region of source text, identified by its starting line and column.
///
/// Spans are produced by the (external) parser and carried unchanged through
/// binding so that every diagnostic can point back at the syntax that caused it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a span from a line, column, and length.
    #[inline]
    pub const fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Zero-length span at a position.
    #[inline]
    pub const fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span covers no text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the span in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Smallest span starting at `self` that also covers `other`.
    ///
    /// Spans on different lines keep the first position and add the lengths.
    #[inline]
    pub fn to(self, other: Span) -> Span {
        if self.line != other.line {
            return Span {
                line: self.line,
                col: self.col,
                len: self.len + other.len,
            };
        }
        let start = self.col.min(other.col);
        let end = (self.col + self.len).max(other.col + other.len);
        Span {
            line: self.line,
            col: start,
            len: end - start,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_empty() {
        assert!(Span::point(3, 4).is_empty());
        assert!(!Span::new(3, 4, 2).is_empty());
    }

    #[test]
    fn to_same_line_covers_both() {
        let a = Span::new(1, 5, 3);
        let b = Span::new(1, 12, 4);
        let joined = a.to(b);
        assert_eq!(joined.col, 5);
        assert_eq!(joined.len, 11);
    }

    #[test]
    fn to_other_line_keeps_start() {
        let joined = Span::new(2, 7, 3).to(Span::new(4, 1, 5));
        assert_eq!((joined.line, joined.col, joined.len), (2, 7, 8));
    }

    #[test]
    fn display_is_line_col() {
        assert_eq!(format!("{}", Span::new(10, 2, 1)), "10:2");
    }
}
