//! Error types shared by the structure and comparison engines.
//!
//! Only fatal conditions are represented here. Per-entry traversal failures
//! become [`crate::tree::EntryIssue`] markers inside the tree, and malformed
//! diff lines are skipped with a warning.

use std::path::{Path, PathBuf};

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The rule set or settings are malformed (bad glob, bad regex, empty value).
    #[error("invalid configuration: {message}")]
    Config {
        /// Human-readable description of the problem.
        message: String,
    },
    /// The traversal root or repository path does not exist.
    #[error("cannot access '{}': no such file or directory", path.display())]
    RootNotFound {
        /// Path that failed to resolve.
        path: PathBuf,
    },
    /// A branch or revision could not be resolved.
    #[error("unknown revision '{reference}'")]
    RefNotFound {
        /// The reference as given by the caller.
        reference: String,
    },
    /// The version-control tool is missing or exited unexpectedly.
    #[error("{tool} failed: {message}")]
    ExternalTool {
        /// Name of the tool that was invoked.
        tool: String,
        /// Captured stderr or spawn failure description.
        message: String,
    },
    /// Filesystem interaction on the root or the settings file failed.
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
