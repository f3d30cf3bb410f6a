//! MPYQ resource container reading and writing
//!
//! A container packs a directory of resource files into one file with three
//! sections:
//!
//! ```text
//! [0..28)   Header: magic(4) size(4) version(4) archive_size(4)
//!                   entry_count(4) entry_table_offset(4) data_offset(4)
//! [28..E)   Entry records, back to back, 40 + name_len + digest_len each
//! [E..end)  Payloads concatenated in entry add order
//! ```
//!
//! All integers are little-endian. Entries are addressed by the two-key
//! name hash from [`mpyq_crypto::hash`], and payload offsets are relative to
//! the start of the data region.
//!
//! # Usage Examples
//!
//! ## Pack a directory
//!
//! ```rust,no_run
//! use mpyq_crypto::CryptTable;
//! use mpyq_formats::archive::ArchiveWriter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = CryptTable::new();
//! let mut writer = ArchiveWriter::new("res", "out/res_1.mpq", &table);
//!
//! let entry = writer.stage("ui/atlas.png")?;
//! writer.add(entry)?;
//!
//! let header = writer.finalize()?;
//! println!("{} entries, {} bytes", header.entry_count, header.archive_size);
//! # Ok(())
//! # }
//! ```
//!
//! ## Read a container
//!
//! ```rust,no_run
//! use mpyq_crypto::CryptTable;
//! use mpyq_formats::archive::ArchiveReader;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = CryptTable::new();
//! let mut reader = ArchiveReader::open("out/res_1.mpq", &table)?;
//!
//! if let Some(entry) = reader.find("ui/atlas.png") {
//!     println!("{} bytes, digest {}", entry.data_size, entry.digest);
//! }
//! let bytes = reader.read_bytes("ui/atlas.png")?;
//! reader.extract_all(Path::new("unpacked"));
//! # Ok(())
//! # }
//! ```

mod entry;
mod error;
mod header;
mod reader;
mod writer;

pub use entry::ArchiveEntry;
pub use error::{ArchiveError, ArchiveResult};
pub use header::ArchiveHeader;
pub use reader::{ArchiveReader, ExtractFailure, ExtractReport, destination_path};
pub use writer::ArchiveWriter;

/// Container format constants
pub mod constants {
    /// Magic signature at the start of every container
    pub const MAGIC: [u8; 4] = *b"MPYQ";

    /// Size of the container header in bytes
    pub const HEADER_SIZE: usize = 28;

    /// Format version written by this crate
    pub const FORMAT_VERSION: u32 = 1;

    /// Size of the fixed-width fields of an entry record
    ///
    /// Two 8-byte hashes plus six 4-byte fields (index, two lengths, time,
    /// offset, size). The name and digest bytes come on top.
    pub const ENTRY_FIXED_SIZE: usize = 40;

    /// Conventional container file suffix
    pub const CONTAINER_SUFFIX: &str = ".mpq";
}
