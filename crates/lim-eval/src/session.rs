//! One sandboxed Lua state and the context of one run.
//!
//! A session is used for exactly one top-level document. Its effects on
//! the host are transactional: the body always reaches the sink, but
//! deferred callbacks run only when the document succeeded.

use lim_types::LimError;
use mlua::Lua;
use std::rc::Rc;
use std::sync::Arc;

use crate::context::{Context, DocumentKind};
use crate::host::{FileSource, ResponseSink};
use crate::logging::LogSink;
use crate::{budget, sandbox};

/// Default VM instruction budget of a run.
pub const DEFAULT_INSTRUCTION_BUDGET: u64 = 100_000_000;

/// Default include nesting limit.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

/// Limits applied to every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// `None` disables the instruction budget.
    pub instruction_budget: Option<u64>,
    /// Lua heap limit in bytes; `None` is unlimited.
    pub memory_limit: Option<usize>,
    pub max_include_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            instruction_budget: Some(DEFAULT_INSTRUCTION_BUDGET),
            memory_limit: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

pub struct Session {
    lua: Lua,
    context: Rc<Context>,
}

impl Session {
    /// Create a sandboxed state with the document primitives installed.
    pub fn new(
        options: &EngineOptions,
        files: Arc<dyn FileSource + Send + Sync>,
        log: Arc<dyn LogSink + Send + Sync>,
    ) -> mlua::Result<Self> {
        let lua = Lua::new();
        sandbox::sandbox(&lua)?;
        if let Some(limit) = options.memory_limit {
            lua.set_memory_limit(limit)?;
        }
        if let Some(limit) = options.instruction_budget {
            budget::install(&lua, limit);
        }
        let context = Context::new(files, log, options.max_include_depth);
        context.install(&lua)?;
        Ok(Self { lua, context })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run a top-level document.
    pub fn run(&self, name: &str, source: &[u8], kind: DocumentKind) -> Result<(), LimError> {
        self.context.run(&self.lua, name, source, kind)
    }

    /// Hand the run's effects to `sink` and return `result` unchanged.
    ///
    /// On success the deferred callbacks run in order; their failures are
    /// logged and never turn the run into a failure. On failure they are
    /// dropped. The output produced so far is written in both cases.
    pub fn finish(
        self,
        result: Result<(), LimError>,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), LimError> {
        match &result {
            Ok(()) => {
                let failures = self.context.run_deferred(sink);
                if !failures.is_empty() {
                    log::debug!("{} deferred callback(s) failed", failures.len());
                }
            }
            Err(err) => {
                let dropped = self.context.discard_deferred();
                log::debug!("run failed, {dropped} deferred callback(s) dropped: {err}");
            }
        }
        sink.write_body(&self.context.take_output());
        result
    }
}
