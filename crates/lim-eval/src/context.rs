//! Execution context shared by a top-level run and all of its includes.

use lim_types::{LimError, Location};
use mlua::Lua;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use crate::host::{FileSource, ResponseError, ResponseSink};
use crate::logging::LogSink;
use crate::{builtin, response, runner};

/// How a document is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Text with `<?lua ... ?>` blocks, transpiled first.
    Markup,
    /// A plain Lua script.
    Script,
}

impl DocumentKind {
    /// `.lua` files are scripts, everything else is markup.
    pub fn for_path(path: &str) -> Self {
        let is_lua = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("lua"));
        if is_lua {
            Self::Script
        } else {
            Self::Markup
        }
    }
}

/// A host effect queued by a document, applied only after success.
type Deferred = Box<dyn FnOnce(&mut dyn ResponseSink) -> Result<(), ResponseError>>;

/// Output buffer, deferred callback queue and include stack of one run.
///
/// Primitives capture an `Rc<Context>`; nothing is shared between runs.
/// The host response sink is only lent to the context while the
/// deferred queue is drained.
pub struct Context {
    out: RefCell<Vec<u8>>,
    deferred: RefCell<Vec<Deferred>>,
    /// Documents currently running, outermost first.
    include_stack: RefCell<Vec<String>>,
    files: Arc<dyn FileSource + Send + Sync>,
    log: Arc<dyn LogSink + Send + Sync>,
    max_include_depth: usize,
}

impl Context {
    pub fn new(
        files: Arc<dyn FileSource + Send + Sync>,
        log: Arc<dyn LogSink + Send + Sync>,
        max_include_depth: usize,
    ) -> Rc<Self> {
        Rc::new(Self {
            out: RefCell::new(Vec::new()),
            deferred: RefCell::new(Vec::new()),
            include_stack: RefCell::new(Vec::new()),
            files,
            log,
            max_include_depth,
        })
    }

    /// Register the document primitives in `lua`'s globals.
    pub fn install(self: &Rc<Self>, lua: &Lua) -> mlua::Result<()> {
        builtin::install(self, lua)?;
        response::install(self, lua)
    }

    // ─────────────────────────────────────────────────────────────
    // Output buffer
    // ─────────────────────────────────────────────────────────────

    /// A copy of the output so far.
    pub fn output(&self) -> Vec<u8> {
        self.out.borrow().clone()
    }

    /// Move the output out, leaving the buffer empty.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.out.borrow_mut())
    }

    pub(crate) fn append_output(&self, bytes: &[u8]) {
        self.out.borrow_mut().extend_from_slice(bytes);
    }

    pub(crate) fn log_sink(&self) -> &dyn LogSink {
        self.log.as_ref()
    }

    // ─────────────────────────────────────────────────────────────
    // Deferred callbacks
    // ─────────────────────────────────────────────────────────────

    /// Queue a host effect.
    pub fn defer(
        &self,
        callback: impl FnOnce(&mut dyn ResponseSink) -> Result<(), ResponseError> + 'static,
    ) {
        self.deferred.borrow_mut().push(Box::new(callback));
    }

    /// Number of queued callbacks.
    pub fn deferred_len(&self) -> usize {
        self.deferred.borrow().len()
    }

    /// Drop every queued callback without running it.
    pub fn discard_deferred(&self) -> usize {
        let dropped = std::mem::take(&mut *self.deferred.borrow_mut());
        dropped.len()
    }

    /// Run queued callbacks in order against `sink`.
    ///
    /// A failing callback does not stop the others. Failures are logged
    /// and returned.
    pub fn run_deferred(&self, sink: &mut dyn ResponseSink) -> Vec<LimError> {
        let callbacks = std::mem::take(&mut *self.deferred.borrow_mut());
        let mut failures = Vec::new();
        for (index, callback) in callbacks.into_iter().enumerate() {
            if let Err(err) = callback(sink) {
                let err = LimError::Callback {
                    index,
                    message: err.to_string(),
                };
                log::warn!("{err}");
                failures.push(err);
            }
        }
        failures
    }

    // ─────────────────────────────────────────────────────────────
    // Documents and includes
    // ─────────────────────────────────────────────────────────────

    /// The innermost document running.
    pub fn current_document(&self) -> Option<String> {
        self.include_stack.borrow().last().cloned()
    }

    /// Run a document against this context.
    pub fn run(
        &self,
        lua: &Lua,
        name: &str,
        source: &[u8],
        kind: DocumentKind,
    ) -> Result<(), LimError> {
        self.include_stack.borrow_mut().push(name.to_string());
        let result = match kind {
            DocumentKind::Markup => runner::run_document(lua, name, source),
            DocumentKind::Script => runner::run_script(lua, name, source),
        };
        self.include_stack.borrow_mut().pop();
        result
    }

    /// Read `path` and run it in place, sharing output and callbacks.
    pub(crate) fn include(&self, lua: &Lua, path: &str) -> Result<(), LimError> {
        let current = self.current_document().unwrap_or_default();
        {
            let stack = self.include_stack.borrow();
            if stack.iter().any(|running| running == path) {
                let chain: Vec<&str> = stack
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(path))
                    .collect();
                return Err(LimError::runtime(
                    Location::file(current),
                    format!("include cycle: {}", chain.join(" -> ")),
                ));
            }
            if stack.len() > self.max_include_depth {
                return Err(LimError::runtime(
                    Location::file(current),
                    format!(
                        "include depth limit of {} exceeded at '{path}'",
                        self.max_include_depth
                    ),
                ));
            }
        }

        let source = self
            .files
            .read(path)
            .map_err(|e| LimError::file_access(path, &e))?;
        log::debug!("{current}: including {path}");
        self.run(lua, path, &source, DocumentKind::for_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{BufferedResponse, MemoryFiles};
    use crate::logging::CapturedLog;

    fn context() -> Rc<Context> {
        Context::new(
            Arc::new(MemoryFiles::new()),
            Arc::new(CapturedLog::new()),
            4,
        )
    }

    #[test]
    fn test_document_kind() {
        assert_eq!(DocumentKind::for_path("setup.lua"), DocumentKind::Script);
        assert_eq!(DocumentKind::for_path("SETUP.LUA"), DocumentKind::Script);
        assert_eq!(DocumentKind::for_path("index.lim"), DocumentKind::Markup);
        assert_eq!(DocumentKind::for_path("lua"), DocumentKind::Markup);
    }

    #[test]
    fn test_deferred_run_in_order_and_continue_after_failure() {
        let ctx = context();
        ctx.defer(|sink| sink.set_status(201));
        ctx.defer(|sink| sink.set_status(500));
        ctx.defer(|sink| {
            sink.write_body(b"third");
            Ok(())
        });
        assert_eq!(ctx.deferred_len(), 3);

        let mut response = BufferedResponse::new();
        let failures = ctx.run_deferred(&mut response);
        assert_eq!(response.status, Some(201));
        assert_eq!(response.body, b"third");
        assert_eq!(
            failures,
            vec![LimError::Callback {
                index: 1,
                message: "status already set to 201".into()
            }]
        );
        assert_eq!(ctx.deferred_len(), 0);
    }

    #[test]
    fn test_discard_deferred() {
        let ctx = context();
        ctx.defer(|sink| sink.set_status(403));
        assert_eq!(ctx.discard_deferred(), 1);
        let mut response = BufferedResponse::new();
        assert!(ctx.run_deferred(&mut response).is_empty());
        assert_eq!(response.status, None);
    }

    #[test]
    fn test_output_buffer() {
        let ctx = context();
        ctx.append_output(b"ab");
        ctx.append_output(b"c");
        assert_eq!(ctx.output(), b"abc");
        assert_eq!(ctx.take_output(), b"abc");
        assert!(ctx.output().is_empty());
    }
}
