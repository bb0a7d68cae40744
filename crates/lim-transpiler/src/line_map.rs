//! Line mapping from generated program lines to document lines.
//!
//! Script bytes are copied verbatim, so their newlines map one to one.
//! Each text call adds one generated line of its own (the newline after
//! `[[`, which Lua discards) and each script block end adds another; both
//! map to the document line where they were introduced.

/// Generated-line to document-line table. Both sides are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    /// `lines[g - 1]` is the document line of generated line `g`.
    lines: Vec<u32>,
}

impl LineMap {
    /// A map holding only generated line 1 → document line 1.
    pub fn new() -> Self {
        Self { lines: vec![1] }
    }

    /// Identity map, for documents run without transpiling.
    pub fn identity() -> Self {
        Self { lines: Vec::new() }
    }

    /// Record that the next generated line comes from `source_line`.
    pub fn push(&mut self, source_line: u32) {
        self.lines.push(source_line);
    }

    /// Number of generated lines recorded.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Translate a generated line to a document line.
    ///
    /// Lines past the end (Lua reports `<eof>` one line late in some
    /// cases) clamp to the last recorded line.
    pub fn source_line(&self, generated: u32) -> u32 {
        if self.lines.is_empty() {
            return generated;
        }
        let idx = (generated.max(1) as usize - 1).min(self.lines.len() - 1);
        self.lines[idx]
    }
}

impl Default for LineMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_clamp() {
        let mut map = LineMap::new();
        map.push(1);
        map.push(2);
        map.push(4);
        assert_eq!(map.len(), 4);
        assert_eq!(map.source_line(1), 1);
        assert_eq!(map.source_line(2), 1);
        assert_eq!(map.source_line(3), 2);
        assert_eq!(map.source_line(4), 4);
        assert_eq!(map.source_line(9), 4);
        assert_eq!(map.source_line(0), 1);
    }

    #[test]
    fn test_identity() {
        let map = LineMap::identity();
        assert!(map.is_empty());
        assert_eq!(map.source_line(17), 17);
    }
}
