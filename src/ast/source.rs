//! Source service: spans, locations and file text.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Source span with byte offsets and line/column positions.
///
/// Lines and columns are 1-indexed; the end column is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    ///
    /// Zero-width nodes inserted by error recovery have no real source
    /// text and yield `None`.
    pub fn from_node(node: tree_sitter::Node) -> Option<Self> {
        if node.is_missing() {
            return None;
        }
        let start = node.start_position();
        let end = node.end_position();
        Some(Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        })
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(&self, other: &Span) -> Span {
        let (start_byte, start_line, start_col) = if other.start_byte < self.start_byte {
            (other.start_byte, other.start_line, other.start_col)
        } else {
            (self.start_byte, self.start_line, self.start_col)
        };
        let (end_byte, end_line, end_col) = if other.end_byte > self.end_byte {
            (other.end_byte, other.end_line, other.end_col)
        } else {
            (self.end_byte, self.end_line, self.end_col)
        };
        Span {
            start_byte,
            end_byte,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A source range in a named file.
///
/// Serialized as `<file>@<startLine>:<startCol>::<endLine>:<endCol>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, span: &Span) -> Self {
        Self {
            file: file.into(),
            start_line: span.start_line,
            start_col: span.start_col,
            end_line: span.end_line,
            end_col: span.end_col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}::{}:{}",
            self.file, self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then(self.start_line.cmp(&other.start_line))
            .then(self.start_col.cmp(&other.start_col))
            .then(self.end_line.cmp(&other.end_line))
            .then(self.end_col.cmp(&other.end_col))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Error returned when a location string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed location: {0}")]
pub struct ParseLocationError(String);

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLocationError(s.to_string());
        // File names may themselves contain '@', so split at the last one.
        let (file, range) = s.rsplit_once('@').ok_or_else(err)?;
        let (start, end) = range.split_once("::").ok_or_else(err)?;
        let point = |p: &str| -> Result<(usize, usize), ParseLocationError> {
            let (line, col) = p.split_once(':').ok_or_else(err)?;
            Ok((
                line.parse().map_err(|_| err())?,
                col.parse().map_err(|_| err())?,
            ))
        };
        let (start_line, start_col) = point(start)?;
        let (end_line, end_col) = point(end)?;
        Ok(Self {
            file: file.to_string(),
            start_line,
            start_col,
            end_line,
            end_col,
        })
    }
}

/// A single source point, `<file>@<line>:<col>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub file: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.file, self.line, self.col)
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Text of one source file together with its project membership.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    in_project: bool,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: String) -> Self {
        Self {
            path: path.into(),
            text,
            in_project: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as written into locations.
    pub fn display_name(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether statements from this file may be indexed.
    pub fn in_project(&self) -> bool {
        self.in_project
    }

    pub fn set_in_project(&mut self, in_project: bool) {
        self.in_project = in_project;
    }

    /// Exact source text covered by a span.
    pub fn slice(&self, span: &Span) -> &str {
        self.text.get(span.start_byte..span.end_byte).unwrap_or("")
    }

    pub fn location(&self, span: &Span) -> Location {
        Location::new(self.display_name(), span)
    }

    /// The point just past the end of a span.
    pub fn end_point(&self, span: &Span) -> Point {
        Point {
            file: self.display_name(),
            line: span.end_line,
            col: span.end_col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(sl: usize, sc: usize, el: usize, ec: usize) -> Span {
        Span {
            start_byte: 0,
            end_byte: 0,
            start_line: sl,
            start_col: sc,
            end_line: el,
            end_col: ec,
        }
    }

    #[test]
    fn test_location_format() {
        let loc = Location::new("/src/a.c", &span(3, 5, 3, 11));
        assert_eq!(loc.to_string(), "/src/a.c@3:5::3:11");
    }

    #[test]
    fn test_location_parse() {
        let loc: Location = "/tmp/x@y/a.c@10:1::12:2".parse().unwrap();
        assert_eq!(loc.file, "/tmp/x@y/a.c");
        assert_eq!((loc.start_line, loc.start_col), (10, 1));
        assert_eq!((loc.end_line, loc.end_col), (12, 2));
        assert!("a.c:1:2".parse::<Location>().is_err());
        assert!("a.c@1:x::2:3".parse::<Location>().is_err());
    }

    #[test]
    fn test_location_serializes_as_string() {
        let loc = Location::new("a.c", &span(1, 1, 1, 4));
        assert_eq!(serde_json::to_string(&loc).unwrap(), "\"a.c@1:1::1:4\"");
    }

    #[test]
    fn test_location_ordering() {
        let a = Location::new("a.c", &span(1, 1, 1, 4));
        let b = Location::new("a.c", &span(2, 1, 2, 4));
        let c = Location::new("b.c", &span(1, 1, 1, 4));
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_span_cover() {
        let a = Span {
            start_byte: 4,
            end_byte: 8,
            ..span(1, 5, 1, 9)
        };
        let b = Span {
            start_byte: 10,
            end_byte: 11,
            ..span(1, 11, 1, 12)
        };
        let c = a.cover(&b);
        assert_eq!((c.start_byte, c.end_byte), (4, 11));
        assert_eq!((c.start_col, c.end_col), (5, 12));
    }

    #[test]
    fn test_source_slice_and_end_point() {
        let file = SourceFile::new("m.c", "int x;\nx = 1;\n".to_string());
        let s = Span {
            start_byte: 7,
            end_byte: 13,
            ..span(2, 1, 2, 7)
        };
        assert_eq!(file.slice(&s), "x = 1;");
        assert_eq!(file.end_point(&s).to_string(), "m.c@2:7");
    }
}
