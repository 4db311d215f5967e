//! Source documents and end-sequence boundaries
//!
//! A [`SourceDocument`] is the verbatim line sequence of one input file. The
//! locator partitions it with a [`Boundary`] into the print body and the
//! shutdown (end) sequence; [`LocatedSource`] pairs the two for assembly.

use std::fmt;

/// UTF-8 byte order mark some slicers prepend to their output
const UTF8_BOM: char = '\u{feff}';

/// Line terminator convention of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// Unix style `\n`
    #[default]
    Lf,
    /// Windows style `\r\n`
    CrLf,
}

impl LineEnding {
    /// Detect the convention from the first terminated line of `text`
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(pos) if pos > 0 && text.as_bytes()[pos - 1] == b'\r' => Self::CrLf,
            _ => Self::Lf,
        }
    }

    /// The terminator characters
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lf => write!(f, "LF"),
            Self::CrLf => write!(f, "CRLF"),
        }
    }
}

/// Index splitting a document into `body = lines[..index]` and
/// `end_sequence = lines[index..]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Boundary(usize);

impl Boundary {
    /// Create a boundary at the given line index
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Boundary placed after the last line (empty end sequence)
    pub fn end_of(lines: &[String]) -> Self {
        Self(lines.len())
    }

    /// Zero-based line index
    pub fn index(&self) -> usize {
        self.0
    }

    /// One-based line number, as shown to users
    pub fn line_number(&self) -> usize {
        self.0 + 1
    }
}

impl From<usize> for Boundary {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Ordered lines of one input file
///
/// Lines are stored without their terminators. The detected line ending is
/// kept so the output can be written back in the same convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: String,
    lines: Vec<String>,
    line_ending: LineEnding,
}

impl SourceDocument {
    /// Split raw file text into a document
    ///
    /// A leading UTF-8 BOM is dropped. A trailing newline does not produce an
    /// extra empty line.
    pub fn parse(name: impl Into<String>, text: &str) -> Self {
        let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
        let line_ending = LineEnding::detect(text);
        let lines = text.lines().map(str::to_string).collect();

        Self {
            name: name.into(),
            lines,
            line_ending,
        }
    }

    /// Display name, usually the file name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Split into `(body, end_sequence)`; boundaries past the end clamp
    pub fn split_at(&self, boundary: Boundary) -> (&[String], &[String]) {
        let index = boundary.index().min(self.lines.len());
        self.lines.split_at(index)
    }
}

/// A document paired with its located end-sequence boundary
#[derive(Debug, Clone, Copy)]
pub struct LocatedSource<'a> {
    document: &'a SourceDocument,
    boundary: Boundary,
}

impl<'a> LocatedSource<'a> {
    /// Pair a document with a boundary, clamped to the document length
    pub fn new(document: &'a SourceDocument, boundary: Boundary) -> Self {
        let boundary = Boundary::new(boundary.index().min(document.len()));
        Self { document, boundary }
    }

    pub fn document(&self) -> &'a SourceDocument {
        self.document
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn name(&self) -> &'a str {
        self.document.name()
    }

    /// Print body: everything before the boundary
    pub fn body(&self) -> &'a [String] {
        self.document.split_at(self.boundary).0
    }

    /// Shutdown sequence: the boundary line and everything after it
    pub fn end_sequence(&self) -> &'a [String] {
        self.document.split_at(self.boundary).1
    }
}
