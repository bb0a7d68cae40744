//! Top-level interpretation of documents.

use lim_eval::{
    DocumentKind, FileSource, FsFiles, LogFacade, LogSink, ResponseSink, Session,
};
use lim_types::{LimError, Location};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;

/// Renders documents into host responses.
///
/// Every call gets a fresh Lua state and context; the interpreter itself
/// only holds configuration and shared host collaborators, so one value
/// can serve many threads.
#[derive(Clone)]
pub struct Interpreter {
    config: Config,
    files: Arc<dyn FileSource + Send + Sync>,
    log: Arc<dyn LogSink + Send + Sync>,
}

impl Interpreter {
    /// Script log records go to the `log` facade.
    pub fn new(config: Config, files: Arc<dyn FileSource + Send + Sync>) -> Self {
        Self {
            config,
            files,
            log: Arc::new(LogFacade),
        }
    }

    /// Serve documents from a directory.
    pub fn with_root(config: Config, root: impl Into<PathBuf>) -> Self {
        Self::new(config, Arc::new(FsFiles::new(root)))
    }

    pub fn with_log_sink(mut self, log: Arc<dyn LogSink + Send + Sync>) -> Self {
        self.log = log;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Interpret a markup document.
    ///
    /// The body, possibly partial, always reaches `sink`. Deferred
    /// response effects reach it only when the run succeeded.
    pub fn interpret(
        &self,
        name: &str,
        source: &[u8],
        sink: &mut dyn ResponseSink,
    ) -> lim_types::Result<()> {
        self.render(name, source, DocumentKind::Markup, sink)
    }

    /// Read a document through the file source and interpret it. `.lua`
    /// files run as plain scripts.
    pub fn interpret_file(&self, path: &str, sink: &mut dyn ResponseSink) -> lim_types::Result<()> {
        let source = self
            .files
            .read(path)
            .map_err(|e| LimError::file_access(path, &e))?;
        self.render(path, &source, DocumentKind::for_path(path), sink)
    }

    fn render(
        &self,
        name: &str,
        source: &[u8],
        kind: DocumentKind,
        sink: &mut dyn ResponseSink,
    ) -> lim_types::Result<()> {
        let session = Session::new(
            &self.config.engine_options(),
            Arc::clone(&self.files),
            Arc::clone(&self.log),
        )
        .map_err(|e| LimError::runtime(Location::file(name), format!("engine setup failed: {e}")))?;

        log::debug!("interpreting {name} ({} bytes)", source.len());
        let result = session.run(name, source, kind);
        if let Err(err) = &result {
            log::debug!("{name} failed: {err}");
        }
        session.finish(result, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lim_eval::{BufferedResponse, MemoryFiles};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_interpreter_is_send_sync() {
        assert_send_sync::<Interpreter>();
    }

    #[test]
    fn test_interpret_file_missing_has_no_location() {
        let interpreter = Interpreter::new(Config::default(), Arc::new(MemoryFiles::new()));
        let mut response = BufferedResponse::new();
        let err = interpreter
            .interpret_file("nope.lim", &mut response)
            .unwrap_err();
        assert_eq!(err.location(), None);
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "cannot read 'nope.lim': not found");
        assert!(response.body.is_empty());
    }
}
