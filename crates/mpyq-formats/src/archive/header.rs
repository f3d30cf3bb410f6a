//! Container header parsing and building

use crate::archive::constants::{FORMAT_VERSION, HEADER_SIZE, MAGIC};
use crate::archive::error::{ArchiveError, ArchiveResult};
use binrw::io::{Cursor, Read, Seek, Write};
use binrw::{BinRead, BinWrite};

/// Container header
///
/// The header is a fixed 28-byte little-endian record:
/// - Magic signature "MPYQ" (4 bytes)
/// - Header size (4 bytes, always 28)
/// - Format version (4 bytes, currently 1)
/// - Total container size (4 bytes)
/// - Entry count (4 bytes)
/// - Entry table offset (4 bytes)
/// - Data region offset (4 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveHeader {
    /// Magic signature, always "MPYQ"
    pub magic: [u8; 4],

    /// Size of this header in bytes
    pub header_size: u32,

    /// Format version
    pub version: u32,

    /// Total container size in bytes
    pub archive_size: u32,

    /// Number of entry records
    pub entry_count: u32,

    /// Byte offset of the first entry record
    pub entry_table_offset: u32,

    /// Byte offset of the data region
    pub data_offset: u32,
}

impl ArchiveHeader {
    /// Create a header for a container layout
    ///
    /// The entry table follows the header directly and the data region
    /// follows the entry table.
    pub fn new(entry_count: usize, entry_table_size: u64, payload_size: u64) -> ArchiveResult<Self> {
        let header_size = HEADER_SIZE as u64;
        let data_offset = header_size + entry_table_size;
        let archive_size = data_offset + payload_size;

        let fit = |value: u64| u32::try_from(value).map_err(|_| ArchiveError::ArchiveTooLarge(value));

        Ok(Self {
            magic: MAGIC,
            header_size: HEADER_SIZE as u32,
            version: FORMAT_VERSION,
            archive_size: fit(archive_size)?,
            entry_count: u32::try_from(entry_count)
                .map_err(|_| ArchiveError::ArchiveTooLarge(entry_count as u64))?,
            entry_table_offset: HEADER_SIZE as u32,
            data_offset: fit(data_offset)?,
        })
    }

    /// Parse a header from the current stream position
    pub fn parse<R: Read + Seek>(reader: &mut R) -> ArchiveResult<Self> {
        let header = Self::read(reader).map_err(|e| ArchiveError::decode("header", e))?;
        header.validate()?;
        Ok(header)
    }

    /// Parse a header from raw bytes
    pub fn from_bytes(data: &[u8]) -> ArchiveResult<Self> {
        Self::parse(&mut Cursor::new(data))
    }

    /// Write the header at the current stream position
    pub fn build<W: Write + Seek>(&self, writer: &mut W) -> ArchiveResult<()> {
        self.write(writer).map_err(ArchiveError::encode)
    }

    /// Serialize to the 28-byte on-disk form
    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let mut buffer = Vec::with_capacity(HEADER_SIZE);
        self.build(&mut Cursor::new(&mut buffer))?;
        Ok(buffer)
    }

    /// Validate the magic signature
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.magic != MAGIC {
            return Err(ArchiveError::InvalidMagic(self.magic));
        }
        Ok(())
    }

    /// Size of the entry table in bytes
    pub fn entry_table_size(&self) -> u32 {
        self.data_offset.saturating_sub(self.entry_table_offset)
    }

    /// Size of the data region in bytes
    pub fn payload_size(&self) -> u32 {
        self.archive_size.saturating_sub(self.data_offset)
    }
}
