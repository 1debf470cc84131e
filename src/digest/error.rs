// Error types for the digest engine
// Classifies I/O failures into the terminal outcomes the session
// controller reports.

use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum DigestError {
    /// Empty or whitespace-only path, or a zero chunk size; rejected
    /// before any I/O happens.
    InvalidArgument { message: String },

    FileNotFound { path: PathBuf },
    PermissionDenied { path: PathBuf, operation: String },
    IoError { path: Option<PathBuf>, operation: String, source: io::Error },

    /// Cooperative cancellation observed at a chunk boundary. A terminal
    /// outcome, not a fault: the controller restores prior state instead
    /// of surfacing an error message.
    Cancelled,

    /// A fault that escaped classification, e.g. a panic inside the
    /// digest worker. Always resolved to a terminal outcome so no
    /// background failure goes unobserved.
    Unexpected { message: String },
}

impl DigestError {
    /// Create an error from an `io::Error` with context about the
    /// operation and the path it touched.
    pub fn from_io_error(err: io::Error, operation: &str, path: Option<PathBuf>) -> Self {
        match (err.kind(), path) {
            (io::ErrorKind::NotFound, Some(p)) => DigestError::FileNotFound { path: p },
            (io::ErrorKind::PermissionDenied, Some(p)) => DigestError::PermissionDenied {
                path: p,
                operation: operation.to_string(),
            },
            (_, path) => DigestError::IoError {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DigestError::Cancelled)
    }
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestError::InvalidArgument { message } => {
                write!(f, "invalid argument: {}", message)
            }
            DigestError::FileNotFound { path } => {
                write!(f, "file not found: {}", path.display())
            }
            DigestError::PermissionDenied { path, operation } => {
                write!(f, "permission denied while {} {}", operation, path.display())
            }
            DigestError::IoError { path: Some(p), operation, source } => {
                write!(f, "I/O error while {} {}: {}", operation, p.display(), source)
            }
            DigestError::IoError { path: None, operation, source } => {
                write!(f, "I/O error while {}: {}", operation, source)
            }
            DigestError::Cancelled => write!(f, "operation cancelled"),
            DigestError::Unexpected { message } => {
                write!(f, "unexpected failure: {}", message)
            }
        }
    }
}

impl std::error::Error for DigestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DigestError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}
