//! Error types for labeling operations

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type for labeling operations
pub type Result<T> = std::result::Result<T, LabelError>;

/// Errors that can occur while parsing, allocating or applying labels
#[derive(Error, Debug)]
pub enum LabelError {
    #[error("Invalid security context: {0}")]
    Parse(String),

    #[error("MCS label already exists: {0}")]
    McsAlreadyExists(String),

    #[error("Empty path")]
    EmptyPath,

    #[error("Context rejected by policy: {0}")]
    InvalidContext(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No unused MCS level left in the configured range")]
    LevelsExhausted,

    #[error("Invalid enforce mode: {0}")]
    InvalidMode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LabelError {
    /// Wrap an I/O failure on a host attribute, keeping its kind and naming the path
    pub fn attr(path: &Path, err: io::Error) -> Self {
        LabelError::Io(io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }

    /// Underlying OS error number, if this came from a failed syscall
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            LabelError::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}
