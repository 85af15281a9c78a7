//! Error types
//!
//! Malformed records are not errors: they surface as tags that fail the
//! length/'N' filter and are dropped silently.

use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    /// Inconsistent or unusable run settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Open/read/write failure on either pass
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// A rewrite worker stopped without reporting a result
    #[error("worker for {0} panicked")]
    Worker(String),
}

impl DedupError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        DedupError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        Self::io(format!("failed to {} {}", action, path.display()), source)
    }
}

pub type Result<T> = std::result::Result<T, DedupError>;

/// Attach a path to an `io::Result`
pub trait IoContext<T> {
    fn at(self, action: &str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, action: &str, path: &Path) -> Result<T> {
        self.map_err(|e| DedupError::io_at(action, path, e))
    }
}
