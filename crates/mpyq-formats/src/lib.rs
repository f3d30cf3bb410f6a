//! Reader and writer for MPYQ resource containers
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate implements the MPYQ container format: a fixed header, a table
//! of variable-length entry records addressed by a two-key name hash, and a
//! data region holding the packed files back to back.
//!
//! # Design Principles
//!
//! - **Separate roles**: [`archive::ArchiveReader`] and
//!   [`archive::ArchiveWriter`] are distinct types sharing only the record
//!   codecs
//! - **Bounded memory**: payloads are streamed from disk when writing and
//!   read one entry at a time when extracting
//! - **Structural errors surface**: a bad magic, a truncated record or a
//!   short payload is always an error, never a partial result
//! - **Round-Trip Guarantee**: parse(build(record)) == record

#![warn(missing_docs)]

pub mod archive;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveHeader, ArchiveReader, ArchiveWriter};
