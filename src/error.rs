//! Error taxonomy for declcheck runs.
//!
//! File-scoped failures (parse, read, single-file rewrite) are recorded and
//! the walk continues. Run-scoped failures (configuration, cancellation,
//! registry lookups) abort the run and surface as `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the operation registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operation {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("no operation registered for {0:?}")]
    NotFound(String),
}

/// Errors that can end a run or be recorded against a file.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("parse error in {path}: {message}")]
    Parse { path: String, message: String },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("run cancelled")]
    Cancelled,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl Error {
    /// Build an I/O error bound to a path.
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Cancelled | Error::Registry(_) | Error::Report(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
