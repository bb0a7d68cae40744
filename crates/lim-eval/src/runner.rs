//! Compiles and runs programs, mapping engine errors to [`LimError`].
//!
//! Chunks are named `=<document>` so the engine reports positions as
//! `<document>:<line>:`. Those lines refer to the generated program and
//! are translated through the document's [`LineMap`].

use lim_transpiler::{transpile, LineMap};
use lim_types::{LimError, Location, SourceFile};
use mlua::{ChunkMode, Lua};

use crate::budget::BudgetExhausted;

/// Lua keeps at most this many bytes of a chunk name in messages.
const CHUNK_ID_LEN: usize = 59;

/// Transpile a markup document and run it.
pub fn run_document(lua: &Lua, name: &str, source: &[u8]) -> Result<(), LimError> {
    let transpiled = transpile(source);
    log::debug!(
        "{name}: {} script block(s), {} generated line(s)",
        transpiled.script_blocks,
        transpiled.line_map.len()
    );
    if transpiled.unclosed_script {
        log::debug!("{name}: script block closed by end of document");
    }
    let chunk = Chunk::new(name, source, transpiled.line_map);
    chunk.run(lua, &transpiled.program)
}

/// Run a plain Lua script, without transpiling.
pub fn run_script(lua: &Lua, name: &str, source: &[u8]) -> Result<(), LimError> {
    Chunk::new(name, source, LineMap::identity()).run(lua, source)
}

/// A document being run, with what is needed to report its errors.
struct Chunk<'a> {
    name: &'a str,
    source: &'a [u8],
    line_map: LineMap,
}

impl<'a> Chunk<'a> {
    fn new(name: &'a str, source: &'a [u8], line_map: LineMap) -> Self {
        Self {
            name,
            source,
            line_map,
        }
    }

    fn run(&self, lua: &Lua, program: &[u8]) -> Result<(), LimError> {
        let function = lua
            .load(program)
            .set_name(format!("={}", self.name))
            .set_mode(ChunkMode::Text)
            .into_function()
            .map_err(|e| self.translate(e))?;
        function.call::<()>(()).map_err(|e| self.translate(e))
    }

    // ─────────────────────────────────────────────────────────────
    // Error translation
    // ─────────────────────────────────────────────────────────────

    fn translate(&self, err: mlua::Error) -> LimError {
        match err {
            mlua::Error::SyntaxError { message, .. } => self.compile_error(&message),
            mlua::Error::RuntimeError(message) => self.runtime_error(&message),
            mlua::Error::MemoryError(message) => {
                LimError::runtime(Location::file(self.name), format!("out of memory: {message}"))
            }
            mlua::Error::CallbackError { traceback, cause } => {
                let inner = match self.recover(&cause) {
                    Some(inner) => inner,
                    None => self.translate((*cause).clone()),
                };
                self.attribute(inner, &traceback)
            }
            other => match self.recover(&other) {
                Some(inner) => inner,
                None => LimError::runtime(Location::file(self.name), other.to_string()),
            },
        }
    }

    /// Find a structured error raised by a primitive or the budget hook.
    fn recover(&self, err: &mlua::Error) -> Option<LimError> {
        match err {
            mlua::Error::ExternalError(external) => {
                if let Some(lim) = external.downcast_ref::<LimError>() {
                    return Some(lim.clone());
                }
                external
                    .downcast_ref::<BudgetExhausted>()
                    .map(|b| LimError::runtime(Location::file(self.name), b.to_string()))
            }
            mlua::Error::CallbackError { cause, .. } | mlua::Error::WithContext { cause, .. } => {
                self.recover(cause)
            }
            _ => None,
        }
    }

    /// Fill in the call-site line of an error raised from a primitive
    /// called by this chunk.
    fn attribute(&self, err: LimError, traceback: &str) -> LimError {
        match err {
            LimError::Runtime {
                mut location,
                message,
            } if location.line.is_none() && location.file == self.name => {
                location.line = self.line_in(traceback);
                LimError::Runtime { location, message }
            }
            LimError::FileAccess {
                path,
                kind,
                message,
                location: None,
            } => LimError::FileAccess {
                path,
                kind,
                message,
                location: Some(Location {
                    file: self.name.to_string(),
                    line: self.line_in(traceback),
                }),
            },
            other => other,
        }
    }

    fn compile_error(&self, message: &str) -> LimError {
        let line = self.line_in(message).unwrap_or(1);
        let message = self.strip_position(message);
        let token = message
            .rsplit_once(" near ")
            .map(|(_, near)| near.trim().trim_matches('\'').to_string());
        let source_line = SourceFile::new(self.source)
            .line(line)
            .unwrap_or_default();
        let column = token
            .as_deref()
            .filter(|t| !t.is_empty() && *t != "<eof>")
            .and_then(|t| source_line.find(t))
            .map(|idx| source_line[..idx].chars().count() as u32 + 1);
        LimError::Compile {
            location: Location::new(self.name, line),
            column,
            token,
            message,
            source_line,
        }
    }

    fn runtime_error(&self, message: &str) -> LimError {
        LimError::Runtime {
            location: Location {
                file: self.name.to_string(),
                line: self.line_in(message),
            },
            message: self.strip_position(message),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Position helpers
    // ─────────────────────────────────────────────────────────────

    /// The chunk name as the engine prints it.
    fn chunk_id(&self) -> &str {
        if self.name.len() <= CHUNK_ID_LEN {
            return self.name;
        }
        let mut end = CHUNK_ID_LEN;
        while !self.name.is_char_boundary(end) {
            end -= 1;
        }
        &self.name[..end]
    }

    /// Document line of the first `<chunk>:<line>:` in `text`.
    fn line_in(&self, text: &str) -> Option<u32> {
        generated_line(text, self.chunk_id()).map(|g| self.line_map.source_line(g))
    }

    /// Drop the leading `<chunk>:<line>: ` and any traceback.
    fn strip_position(&self, message: &str) -> String {
        let message = message
            .split_once("\nstack traceback:")
            .map_or(message, |(head, _)| head);
        let prefix = format!("{}:", self.chunk_id());
        if let Some(rest) = message.strip_prefix(&prefix) {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits > 0 {
                if let Some(tail) = rest[digits..].strip_prefix(':') {
                    return tail.trim_start().to_string();
                }
            }
        }
        message.to_string()
    }
}

/// Line number of the first `<chunk>:<line>:` occurrence in `text`.
///
/// The match must start the text or follow whitespace, so `a.lim` does
/// not match inside `data.lim`.
fn generated_line(text: &str, chunk: &str) -> Option<u32> {
    let prefix = format!("{chunk}:");
    text.match_indices(&prefix).find_map(|(idx, _)| {
        let boundary = text[..idx]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if !boundary {
            return None;
        }
        let rest = &text[idx + prefix.len()..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || !rest[digits..].starts_with(':') {
            return None;
        }
        rest[..digits].parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A state with a no-op text primitive.
    fn bare_lua() -> Lua {
        let lua = Lua::new();
        let text = lua.create_function(|_, _: mlua::Value| Ok(())).unwrap();
        lua.globals().set(lim_transpiler::TEXT_PRIMITIVE, text).unwrap();
        lua
    }

    #[test]
    fn test_generated_line() {
        assert_eq!(generated_line("index.lim:12: boom", "index.lim"), Some(12));
        assert_eq!(
            generated_line("stack traceback:\n\t[C]: in ?\n\tindex.lim:3: in main chunk", "index.lim"),
            Some(3)
        );
        assert_eq!(generated_line("data.lim:4: x", "a.lim"), None);
        assert_eq!(generated_line("index.lim: no line", "index.lim"), None);
    }

    #[test]
    fn test_strip_position() {
        let chunk = Chunk::new("index.lim", b"", LineMap::new());
        assert_eq!(
            chunk.strip_position("index.lim:3: boom\nstack traceback:\n\t[C]: in ?"),
            "boom"
        );
        assert_eq!(chunk.strip_position("plain message"), "plain message");
    }

    #[test]
    fn test_long_chunk_name_truncated() {
        let name = "x".repeat(80);
        let chunk = Chunk::new(&name, b"", LineMap::identity());
        assert_eq!(chunk.chunk_id().len(), CHUNK_ID_LEN);
        let message = format!("{}:7: boom", &name[..CHUNK_ID_LEN]);
        assert_eq!(chunk.line_in(&message), Some(7));
    }

    #[test]
    fn test_runtime_error_line_mapped() {
        let lua = bare_lua();
        let err = run_document(&lua, "page.lim", b"one\ntwo\n<?lua\nerror('boom')\n?>").unwrap_err();
        match err {
            LimError::Runtime { location, message } => {
                assert_eq!(location, Location::new("page.lim", 4));
                assert_eq!(message, "boom");
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[test]
    fn test_syntax_error_line_mapped() {
        let lua = bare_lua();
        let err = run_document(&lua, "page.lim", b"a\nb\n<?lua if then ?>").unwrap_err();
        match err {
            LimError::Compile {
                location,
                token,
                column,
                source_line,
                ..
            } => {
                assert_eq!(location, Location::new("page.lim", 3));
                assert_eq!(token.as_deref(), Some("then"));
                assert_eq!(column, Some(10));
                assert_eq!(source_line, "<?lua if then ?>");
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_script() {
        let lua = Lua::new();
        run_script(&lua, "setup.lua", b"answer = 42").unwrap();
        let answer: i64 = lua.globals().get("answer").unwrap();
        assert_eq!(answer, 42);

        let err = run_script(&lua, "setup.lua", b"\n\nerror('x')").unwrap_err();
        assert_eq!(err.location(), Some(&Location::new("setup.lua", 3)));
    }
}
