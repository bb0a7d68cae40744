//! Host collaborators: where documents come from and where responses go.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Reads documents for `include` and for top-level interpretation.
///
/// `NotFound` and `PermissionDenied` are reported through the matching
/// [`io::ErrorKind`]; anything else counts as a generic I/O failure.
pub trait FileSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Documents under a root directory.
///
/// Absolute paths and `..` components are rejected as permission denied,
/// so a document can never include a file outside the root.
#[derive(Debug, Clone)]
pub struct FsFiles {
    root: PathBuf,
}

impl FsFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("path '{path}' leaves the document root"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileSource for FsFiles {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.resolve(path)?)
    }
}

/// In-memory documents, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    files: HashMap<String, Vec<u8>>,
    denied: HashSet<String>,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document.
    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }

    /// Make reads of `path` fail with permission denied.
    pub fn with_denied(mut self, path: impl Into<String>) -> Self {
        self.denied.insert(path.into());
        self
    }
}

impl FileSource for MemoryFiles {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such document"))
    }
}

/// Failures of host response effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("invalid status code {0}")]
    InvalidStatus(i64),
    #[error("status already set to {0}")]
    StatusAlreadySet(u16),
}

/// The host response a rendered document ends up in.
pub trait ResponseSink {
    /// Set the response status. Called only from deferred callbacks.
    fn set_status(&mut self, code: u16) -> Result<(), ResponseError>;

    /// Receive the rendered body.
    fn write_body(&mut self, body: &[u8]);
}

/// A response held in memory. The first status set wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    pub status: Option<u16>,
    pub body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for BufferedResponse {
    fn set_status(&mut self, code: u16) -> Result<(), ResponseError> {
        if let Some(existing) = self.status {
            return Err(ResponseError::StatusAlreadySet(existing));
        }
        self.status = Some(code);
        Ok(())
    }

    fn write_body(&mut self, body: &[u8]) {
        self.body.extend_from_slice(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_files() {
        let files = MemoryFiles::new()
            .with_file("a.lim", "A")
            .with_denied("secret.lim");
        assert_eq!(files.read("a.lim").unwrap(), b"A");
        assert_eq!(
            files.read("b.lim").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
        assert_eq!(
            files.read("secret.lim").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_fs_files_reads_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/nav.lim"), "nav").unwrap();
        let files = FsFiles::new(dir.path());
        assert_eq!(files.read("partials/nav.lim").unwrap(), b"nav");
        assert_eq!(
            files.read("missing.lim").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_fs_files_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        let files = FsFiles::new(dir.path());
        for path in ["../etc/passwd", "/etc/passwd", "a/../../b"] {
            assert_eq!(
                files.read(path).unwrap_err().kind(),
                io::ErrorKind::PermissionDenied,
                "{path}"
            );
        }
    }

    #[test]
    fn test_buffered_response_first_status_wins() {
        let mut response = BufferedResponse::new();
        response.set_status(403).unwrap();
        assert_eq!(
            response.set_status(500),
            Err(ResponseError::StatusAlreadySet(403))
        );
        assert_eq!(response.status, Some(403));
        response.write_body(b"a");
        response.write_body(b"b");
        assert_eq!(response.text(), "ab");
    }
}
