use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in an original document.
///
/// Line numbers are 1-based. `line` is `None` when the engine gave no usable
/// position (e.g. an instruction budget abort).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Location {
    /// A location pointing at a specific line.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }

    /// A location naming only the document.
    pub fn file(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// Holds a document's raw bytes for error reporting.
#[derive(Debug, Clone)]
pub struct SourceFile {
    source: Vec<u8>,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(
                source
                    .iter()
                    .enumerate()
                    .filter(|(_, &b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number, lossily decoded.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<String> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        let line = String::from_utf8_lossy(&self.source[start..end]);
        Some(line.trim_end_matches('\r').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("index.lim", 7).to_string(), "index.lim:7");
        assert_eq!(Location::file("index.lim").to_string(), "index.lim");
    }

    #[test]
    fn test_source_file_line_extraction() {
        let src = SourceFile::new("line one\nline two\nline three");
        assert_eq!(src.line(1).as_deref(), Some("line one"));
        assert_eq!(src.line(2).as_deref(), Some("line two"));
        assert_eq!(src.line(3).as_deref(), Some("line three"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn test_source_file_crlf() {
        let src = SourceFile::new("line one\r\nline two\r\n");
        assert_eq!(src.line(1).as_deref(), Some("line one"));
        assert_eq!(src.line(2).as_deref(), Some("line two"));
        assert_eq!(src.line(3).as_deref(), Some(""));
    }

    #[test]
    fn test_source_file_invalid_utf8() {
        let src = SourceFile::new(vec![b'a', 0xff, b'\n', b'b']);
        assert_eq!(src.line(1).as_deref(), Some("a\u{fffd}"));
        assert_eq!(src.line(2).as_deref(), Some("b"));
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("");
        assert_eq!(src.line(1).as_deref(), Some(""));
    }
}
