//! Source locations and spans
//!
//! Positions are line/column pairs (both 1-based) because that is what the
//! editor hands over for a caret, and because document order is simply the
//! lexicographic order of `(line, column)`.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A position in a source file
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Display, Serialize, Deserialize,
)]
#[display("{line}:{column}")]
pub struct Location {
    /// Line, starting at 1
    pub line: u32,
    /// Column, starting at 1
    pub column: u32,
}

impl Location {
    /// Create a location
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The location `columns` further right on the same line
    #[must_use]
    pub const fn offset_columns(self, columns: u32) -> Self {
        Self {
            line: self.line,
            column: self.column + columns,
        }
    }
}

/// A half-open region `[start, end)` of a source file
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Display, Serialize, Deserialize)]
#[display("{start}-{end}")]
pub struct Span {
    /// First position covered
    pub start: Location,
    /// First position after the region
    pub end: Location,
}

impl Span {
    /// Create a span
    pub const fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `at`
    pub const fn empty(at: Location) -> Self {
        Self { start: at, end: at }
    }

    /// Whether the span covers nothing
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `location` lies inside the span; the end position counts as
    /// inside so a caret placed right after a token still belongs to it
    pub fn contains(&self, location: Location) -> bool {
        self.start <= location && location <= self.end
    }

    /// Whether `location` lies strictly inside the span
    pub fn strictly_contains(&self, location: Location) -> bool {
        self.start < location && location < self.end
    }

    /// The smallest span covering both `self` and `other`
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_order() {
        assert!(Location::new(3, 40) < Location::new(4, 1));
        assert!(Location::new(4, 1) < Location::new(4, 2));
    }

    #[test]
    fn test_contains_and_cover() {
        let span = Span::new(Location::new(2, 5), Location::new(2, 9));
        assert!(span.contains(Location::new(2, 5)));
        assert!(span.contains(Location::new(2, 9)));
        assert!(!span.strictly_contains(Location::new(2, 9)));
        assert!(!span.contains(Location::new(3, 1)));

        let wider = span.cover(Span::empty(Location::new(1, 1)));
        assert_eq!(wider.start, Location::new(1, 1));
        assert_eq!(wider.end, Location::new(2, 9));
        assert_eq!(format!("{wider}"), "1:1-2:9");
    }
}
