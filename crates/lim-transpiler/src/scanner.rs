//! Byte-level scanner that transpiles a document into a Lua program.
//!
//! - Literal text is escaped and wrapped in a [`TEXT_PRIMITIVE`] call
//! - Script bytes are copied verbatim
//! - A block left open at end of input is closed implicitly
//! - Every generated line is recorded in a [`LineMap`]

use crate::escape;
use crate::line_map::LineMap;
use crate::{CLOSE_MARKER, OPEN_MARKER, TEXT_PRIMITIVE};

/// Scan state: which kind of byte the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Literal text, emitted through the text primitive.
    Text,
    /// Lua code between `<?lua` and `?>`.
    Script,
}

/// Result of transpiling one document.
#[derive(Debug, Clone)]
pub struct Transpiled {
    /// The generated Lua program.
    pub program: Vec<u8>,
    /// Generated line → document line.
    pub line_map: LineMap,
    /// Number of script blocks opened.
    pub script_blocks: usize,
    /// The last block had no closing marker.
    pub unclosed_script: bool,
}

/// Transpile `source` into a single Lua program. Never fails; malformed
/// Lua surfaces when the program is compiled.
pub fn transpile(source: &[u8]) -> Transpiled {
    Scanner::new(source).scan()
}

struct Scanner<'src> {
    source: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
    /// Current document line (1-based).
    line: u32,
    state: State,
    /// Escaped literal text not yet flushed.
    pending: Vec<u8>,
    /// Document line where `pending` starts.
    pending_line: u32,
    program: Vec<u8>,
    line_map: LineMap,
    script_blocks: usize,
}

impl<'src> Scanner<'src> {
    fn new(source: &'src [u8]) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            state: State::Text,
            pending: Vec::new(),
            pending_line: 1,
            program: Vec::with_capacity(source.len() + source.len() / 4),
            line_map: LineMap::new(),
            script_blocks: 0,
        }
    }

    fn scan(mut self) -> Transpiled {
        while !self.at_end() {
            match self.state {
                State::Text => self.scan_text(),
                State::Script => self.scan_script(),
            }
        }

        let unclosed_script = self.state == State::Script;
        if !unclosed_script {
            self.flush_text();
        }

        Transpiled {
            program: self.program,
            line_map: self.line_map,
            script_blocks: self.script_blocks,
            unclosed_script,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Byte-level helpers
    // ─────────────────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Whether `marker` starts at the cursor. A marker cut off by the
    /// end of input does not match.
    fn at_marker(&self, marker: &[u8]) -> bool {
        self.source[self.pos..].starts_with(marker)
    }

    fn advance(&mut self) -> u8 {
        let b = self.source[self.pos];
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        b
    }

    /// Append a newline to the program, mapped to `source_line`.
    fn emit_newline(&mut self, source_line: u32) {
        self.program.push(b'\n');
        self.line_map.push(source_line);
    }

    // ─────────────────────────────────────────────────────────────
    // States
    // ─────────────────────────────────────────────────────────────

    fn scan_text(&mut self) {
        if self.at_marker(OPEN_MARKER) {
            self.flush_text();
            self.pos += OPEN_MARKER.len();
            self.state = State::Script;
            self.script_blocks += 1;
            return;
        }

        if self.pending.is_empty() {
            self.pending_line = self.line;
        }
        let b = self.advance();
        escape::encode_byte(b, &mut self.pending);
    }

    fn scan_script(&mut self) {
        if self.at_marker(CLOSE_MARKER) {
            self.pos += CLOSE_MARKER.len();
            self.state = State::Text;
            // Ends a trailing `--` comment before the next text call.
            self.emit_newline(self.line);
            return;
        }

        let b = self.advance();
        if b == b'\n' {
            self.emit_newline(self.line);
        } else {
            self.program.push(b);
        }
    }

    /// Emit pending text as `__lim_text([[\n...]]);`.
    fn flush_text(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);

        self.program.extend_from_slice(TEXT_PRIMITIVE.as_bytes());
        self.program.extend_from_slice(b"([[");
        // Lua drops a newline directly after `[[`; this one absorbs that.
        self.emit_newline(self.pending_line);

        let mut line = self.pending_line;
        for b in pending {
            if b == b'\n' {
                line += 1;
                self.emit_newline(line);
            } else {
                self.program.push(b);
            }
        }
        self.program.extend_from_slice(b"]]);");
    }
}
