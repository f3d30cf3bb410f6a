//! Error types for the packer.
//!
//! All errors use thiserror for consistent error handling across the codebase.

use mpyq_formats::archive::ArchiveError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for packer operations
pub type Result<T> = std::result::Result<T, PackerError>;

/// Errors from merging, updating and reading sets of containers.
#[derive(Debug, Error)]
pub enum PackerError {
    /// An existing container could not be opened or read
    #[error("Container {path}: {source}")]
    Container {
        /// Path of the offending container
        path: PathBuf,
        /// Underlying container error
        #[source]
        source: ArchiveError,
    },

    /// Every file in the source tree is already packed with the same content
    #[error("No changes to package")]
    NothingToPackage,

    /// A directory the operation needs does not exist
    #[error("Directory not found: {0}")]
    MissingDirectory(PathBuf),

    /// Container writing or staging failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Directory traversal failed
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackerError {
    pub(crate) fn container(path: impl Into<PathBuf>, source: ArchiveError) -> Self {
        Self::Container {
            path: path.into(),
            source,
        }
    }

    /// Check if this error only means there was nothing to do
    pub fn is_nothing_to_package(&self) -> bool {
        matches!(self, Self::NothingToPackage)
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configured directory does not exist
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A configuration value is malformed
    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        /// Name of the offending option
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}
