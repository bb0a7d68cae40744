use crate::Location;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a document could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAccessKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl FileAccessKind {
    /// Classify an I/O error.
    pub fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Other,
        }
    }

    /// The response status a host should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::PermissionDenied => 403,
            Self::Other => 500,
        }
    }
}

impl fmt::Display for FileAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Other => write!(f, "i/o error"),
        }
    }
}

/// The closed set of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileAccess,
    Compile,
    Runtime,
    Formatting,
    Callback,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileAccess => write!(f, "file access"),
            Self::Compile => write!(f, "compile"),
            Self::Runtime => write!(f, "runtime"),
            Self::Formatting => write!(f, "formatting"),
            Self::Callback => write!(f, "callback"),
        }
    }
}

/// An interpretation error.
///
/// Positions always refer to the original document, never to the
/// generated program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum LimError {
    /// A document could not be read.
    FileAccess {
        path: String,
        kind: FileAccessKind,
        message: String,
        /// The `include` call that asked for the file, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<Location>,
    },
    /// The generated program failed to parse.
    Compile {
        location: Location,
        /// 1-based column of the offending token, when it could be found.
        #[serde(skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        message: String,
        source_line: String,
    },
    /// The program parsed but failed while running.
    Runtime { location: Location, message: String },
    /// A `log.*` call whose arguments did not match its template.
    Formatting { template: String, message: String },
    /// A deferred callback failed after a successful run.
    Callback { index: usize, message: String },
}

impl LimError {
    /// Create a runtime error.
    pub fn runtime(location: Location, message: impl Into<String>) -> Self {
        Self::Runtime {
            location,
            message: message.into(),
        }
    }

    /// Create a file access error from an I/O failure.
    pub fn file_access(path: impl Into<String>, err: &std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            kind: FileAccessKind::from_io(err),
            message: err.to_string(),
            location: None,
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileAccess { .. } => ErrorKind::FileAccess,
            Self::Compile { .. } => ErrorKind::Compile,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::Formatting { .. } => ErrorKind::Formatting,
            Self::Callback { .. } => ErrorKind::Callback,
        }
    }

    /// The response status a host should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileAccess { kind, .. } => kind.status_code(),
            _ => 500,
        }
    }

    /// The document position, if the error has one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::FileAccess { location, .. } => location.as_ref(),
            Self::Compile { location, .. } | Self::Runtime { location, .. } => Some(location),
            Self::Formatting { .. } | Self::Callback { .. } => None,
        }
    }
}

impl fmt::Display for LimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileAccess {
                path,
                kind,
                location,
                ..
            } => {
                if let Some(location) = location {
                    write!(f, "{location}: ")?;
                }
                write!(f, "cannot read '{path}': {kind}")
            }
            Self::Compile {
                location,
                column: Some(column),
                message,
                ..
            } => write!(f, "{location} (col {column}): syntax error: {message}"),
            Self::Compile {
                location, message, ..
            } => write!(f, "{location}: syntax error: {message}"),
            Self::Runtime { location, message } => write!(f, "{location}: {message}"),
            Self::Formatting { template, message } => {
                write!(f, "bad log format {template:?}: {message}")
            }
            Self::Callback { index, message } => {
                write!(f, "deferred callback #{index} failed: {message}")
            }
        }
    }
}

impl std::error::Error for LimError {}
