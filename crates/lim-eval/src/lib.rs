//! LIM evaluator: runs transpiled documents on a sandboxed Lua state.
//!
//! A [`Session`] owns one Lua state and one [`Context`]. The context holds
//! the output buffer and the deferred callback queue, and backs the
//! primitives a document can call (`write`, `print`, `include`, `log.*`,
//! `response.status`). Deferred callbacks reach the host's
//! [`ResponseSink`] only after the whole run succeeded.

pub mod budget;
mod builtin;
pub mod context;
pub mod format;
pub mod host;
pub mod logging;
mod response;
pub mod runner;
pub mod sandbox;
pub mod session;

pub use context::{Context, DocumentKind};
pub use host::{BufferedResponse, FileSource, FsFiles, MemoryFiles, ResponseError, ResponseSink};
pub use logging::{CapturedLog, LogFacade, LogLevel, LogSink};
pub use session::{EngineOptions, Session};
