//! Error types for container operations

use std::path::PathBuf;
use thiserror::Error;

/// Container operation result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for reading and writing containers
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The header does not start with the container magic
    #[error("Invalid container magic: expected 'MPYQ', got {0:?}")]
    InvalidMagic([u8; 4]),

    /// The stream ended inside a record
    #[error("Truncated {record} record")]
    TruncatedRecord {
        /// Which record was being decoded
        record: &'static str,
    },

    /// The header declares an entry count no container can have
    #[error("Invalid entry count: {0}")]
    InvalidEntryCount(u32),

    /// Two entries share a logical name or lookup key
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// No entry with the requested logical name
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// The data region holds fewer bytes than an entry declares
    #[error("Short read for {name}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Logical name of the entry
        name: String,
        /// Declared payload size
        expected: u64,
        /// Bytes actually available
        actual: u64,
    },

    /// A file to be packed does not exist or is not a regular file
    #[error("Source file missing: {}", .0.display())]
    SourceFileMissing(PathBuf),

    /// A file to be packed could not be read
    #[error("Failed to read source file {}: {source}", path.display())]
    SourceRead {
        /// Path of the source file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The output path already holds a file
    #[error("Output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Finalizing a writer that never had an entry added
    #[error("Container has no entries")]
    EmptyArchive,

    /// The layout does not fit the 32-bit offsets of the format
    #[error("Container too large: {0} bytes exceeds 32-bit offsets")]
    ArchiveTooLarge(u64),

    /// A logical name would resolve outside the extraction root
    #[error("Unsafe entry path: {0}")]
    UnsafePath(String),

    /// Malformed record content
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRw(#[source] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Map a binrw failure while decoding `record`
    ///
    /// End of stream becomes [`ArchiveError::TruncatedRecord`], custom
    /// decoding failures become [`ArchiveError::InvalidFormat`].
    pub(crate) fn decode(record: &'static str, err: binrw::Error) -> Self {
        if err.is_eof() {
            return Self::TruncatedRecord { record };
        }
        match err {
            binrw::Error::Io(io) => Self::Io(io),
            binrw::Error::Custom { err, .. } => Self::InvalidFormat(err.to_string()),
            other => Self::BinRw(other),
        }
    }

    /// Map a binrw failure while encoding
    pub(crate) fn encode(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(io) => Self::Io(io),
            binrw::Error::Custom { err, .. } => Self::InvalidFormat(err.to_string()),
            other => Self::BinRw(other),
        }
    }

    /// Check if this error means the container is corrupt or foreign
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic(_)
                | Self::TruncatedRecord { .. }
                | Self::InvalidEntryCount(_)
                | Self::DuplicateEntry(_)
                | Self::ShortRead { .. }
                | Self::InvalidFormat(_)
        )
    }

    /// Check if this error is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_) | Self::SourceFileMissing(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_truncated() {
        let err = binrw::Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(matches!(
            ArchiveError::decode("entry", err),
            ArchiveError::TruncatedRecord { record: "entry" }
        ));
    }

    #[test]
    fn test_classification() {
        assert!(ArchiveError::InvalidMagic(*b"ABCD").is_structural());
        assert!(ArchiveError::DuplicateEntry("a".into()).is_structural());
        assert!(!ArchiveError::EmptyArchive.is_structural());
        assert!(ArchiveError::EntryNotFound("a".into()).is_not_found());
        assert!(!ArchiveError::InvalidEntryCount(0).is_not_found());
        assert!(!ArchiveError::OutputExists(PathBuf::from("res.mpq")).is_structural());
    }
}
