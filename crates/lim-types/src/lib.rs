//! Shared types for LIM.
//!
//! This crate defines the error taxonomy, source locations and source
//! file helpers used across the transpiler, evaluator and interpreter.

mod error;
mod source;

pub use error::{ErrorKind, FileAccessKind, LimError};
pub use source::{Location, SourceFile};

/// Result type used throughout LIM.
pub type Result<T> = std::result::Result<T, LimError>;
