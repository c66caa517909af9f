use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no metadata at {0}")]
    NotFound(PathBuf),

    #[error("{version} is not present in the metadata at {path}")]
    IncompatibleRemoval { path: PathBuf, version: String },

    #[error("malformed entry {name}: {reason}")]
    MalformedEntry { name: String, reason: String },

    #[error("timed out waiting for the metadata lock on {0}")]
    ConcurrencyConflict(PathBuf),

    #[error("storage failure at {path}: {source}")]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metadata document at {path}: {reason}")]
    MalformedDocument { path: PathBuf, reason: String },
}

impl MetadataError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> MetadataError {
        MetadataError::StorageFailure {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a recursive rebuild. Node-local failures are collected here
/// rather than aborting sibling nodes; the caller decides how to surface
/// them.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Artifact roots whose descriptors were rewritten.
    pub built: Vec<PathBuf>,
    pub failures: Vec<NodeFailure>,
    /// Nodes not attempted because the operation was cancelled.
    pub cancelled: usize,
}

#[derive(Debug)]
pub struct NodeFailure {
    pub path: PathBuf,
    pub error: MetadataError,
}

impl RebuildReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.cancelled == 0
    }
}

impl fmt::Display for RebuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rebuilt {} artifact root(s)", self.built.len())?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed:", self.failures.len())?;
            for failure in &self.failures {
                write!(f, " {} ({})", failure.path.display(), failure.error)?;
            }
        }
        if self.cancelled > 0 {
            write!(f, ", {} cancelled", self.cancelled)?;
        }
        Ok(())
    }
}
