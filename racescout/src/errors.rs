//! Error types for racescout.
//!
//! Two families live here:
//!
//! 1. [`SearchError`] covers everything that goes wrong *before* a race starts:
//!    a bad worker count, a dataset that cannot be read, a broken config file.
//!    These are returned through [`SearchResult`] and the coordinator is never built.
//!
//! 2. [`RaceError`] covers infrastructure failures *during* a race: a worker that
//!    could not be launched, a worker that terminated abnormally, a deadline or an
//!    external abort. These never escape as `Err`; they are carried inside
//!    [`crate::results::Verdict::InfrastructureError`] so the caller always gets a
//!    full report, including which workers were cancelled.
//!
//! ```rust,ignore
//! match race_search(dataset, "needle", workers)?.verdict {
//!     Verdict::Success { position } => // found,
//!     Verdict::Failure => // searched everything, nothing there,
//!     Verdict::InfrastructureError(e) => // result can't be trusted,
//! }
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result type for operations that run before or around a race
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that prevent a search from starting
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Usage error: {0}")]
    Usage(String),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

impl SearchError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::string::FromUtf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }

    /// Maps an IO error raised while opening or reading `path`
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Infrastructure failures that abort a running race
#[derive(Error, Debug)]
pub enum RaceError {
    #[error("failed to launch worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("worker {worker} terminated abnormally: {message}")]
    WorkerFailed { worker: usize, message: String },
    #[error("completion channel closed with {outstanding} worker(s) unaccounted for")]
    Disconnected { outstanding: usize },
    #[error("deadline of {} exceeded", humantime::format_duration(*.deadline))]
    DeadlineExceeded { deadline: Duration },
    #[error("search aborted by caller")]
    Aborted,
}

impl RaceError {
    /// Returns the id of the worker responsible, if the failure is tied to one
    pub fn worker(&self) -> Option<usize> {
        match self {
            Self::Spawn { worker, .. } | Self::WorkerFailed { worker, .. } => Some(*worker),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("data.txt");
        let err = SearchError::file_not_found(path);
        assert!(matches!(err, SearchError::FileNotFound(_)));

        let err = SearchError::permission_denied(path);
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::usage("worker count must be positive");
        assert!(matches!(err, SearchError::Usage(_)));

        let err = SearchError::config_error("bad deadline");
        assert!(matches!(err, SearchError::ConfigError(_)));
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let path = Path::new("missing.txt");
        let err = SearchError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SearchError::FileNotFound(p) if p == path));

        let err = SearchError::from_io(
            path,
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, SearchError::PermissionDenied(_)));

        let err = SearchError::from_io(path, std::io::Error::other("disk on fire"));
        assert!(matches!(err, SearchError::IoError(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::usage("NUMBER OF WORKERS must be a positive integer");
        assert_eq!(
            err.to_string(),
            "Usage error: NUMBER OF WORKERS must be a positive integer"
        );

        let err = SearchError::file_not_found("strings.txt");
        assert_eq!(err.to_string(), "File not found: strings.txt");

        let err = RaceError::WorkerFailed {
            worker: 3,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "worker 3 terminated abnormally: boom");

        let err = RaceError::DeadlineExceeded {
            deadline: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "deadline of 1s 500ms exceeded");

        let err = RaceError::Disconnected { outstanding: 2 };
        assert_eq!(
            err.to_string(),
            "completion channel closed with 2 worker(s) unaccounted for"
        );
    }

    #[test]
    fn test_race_error_worker() {
        let err = RaceError::Spawn {
            worker: 2,
            source: std::io::Error::other("no threads left"),
        };
        assert_eq!(err.worker(), Some(2));
        assert_eq!(RaceError::Aborted.worker(), None);
    }
}
