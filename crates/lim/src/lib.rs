//! LIM: Lua embedded in markup.
//!
//! ```text
//! Document → Transpiler → Lua program + line map → Runner → body + deferred effects → host
//! ```
//!
//! Documents mix literal text with `<?lua ... ?>` blocks. Text is written
//! to the response body as is; blocks run on a sandboxed Lua 5.4 state
//! and may `write`, `print`, `include` other documents, `log.*` and set
//! `response.status`.
//!
//! ```no_run
//! use lim::{BufferedResponse, Config, Interpreter};
//!
//! let interpreter = Interpreter::with_root(Config::default(), "site");
//! let mut response = BufferedResponse::new();
//! interpreter.interpret_file("index.lim", &mut response)?;
//! println!("{}", response.text());
//! # Ok::<(), lim::LimError>(())
//! ```

pub mod config;
pub mod interpreter;

pub use config::{Config, ConfigError};
pub use interpreter::Interpreter;

pub use lim_eval::{
    BufferedResponse, CapturedLog, FileSource, FsFiles, LogFacade, LogLevel, LogSink,
    MemoryFiles, ResponseError, ResponseSink,
};
pub use lim_transpiler::{transpile, LineMap, Transpiled};
pub use lim_types::{ErrorKind, FileAccessKind, LimError, Location};
