//! Entry record parsing and building

use crate::archive::constants::ENTRY_FIXED_SIZE;
use crate::archive::error::{ArchiveError, ArchiveResult};
use binrw::io::{Cursor, Read, Seek, Write};
use binrw::{BinRead, BinResult, BinWrite, Endian};
use mpyq_crypto::NameHash;

/// One packed logical file
///
/// On disk an entry is a variable-length record:
/// - `hash_a`, `hash_b` (8 bytes each)
/// - sequence index (4 bytes)
/// - name length (4 bytes) followed by the UTF-8 name
/// - modification time (4 bytes, Unix seconds)
/// - digest length (4 bytes) followed by the ASCII hex digest
/// - data offset relative to the data region (4 bytes)
/// - data size (4 bytes)
///
/// The two length fields are derived from `name` and `digest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// First lookup key
    pub hash_a: u64,
    /// Second lookup key
    pub hash_b: u64,
    /// 1-based staging order
    pub sequence_index: u32,
    /// Logical name, `/`-separated relative path
    pub name: String,
    /// Modification time in Unix seconds
    pub modification_time: u32,
    /// Hex content digest
    pub digest: String,
    /// Payload offset relative to the data region
    pub data_offset: u32,
    /// Payload size in bytes
    pub data_size: u32,
}

impl ArchiveEntry {
    /// Record size on disk
    pub fn size(&self) -> u64 {
        ENTRY_FIXED_SIZE as u64 + self.name.len() as u64 + self.digest.len() as u64
    }

    /// The `(hash_a, hash_b)` pair used for lookups
    pub fn lookup_key(&self) -> (u64, u64) {
        (self.hash_a, self.hash_b)
    }

    /// Check whether this entry answers a lookup for `hash`
    pub fn matches(&self, hash: &NameHash) -> bool {
        self.lookup_key() == hash.as_wide()
    }

    /// Parse one record from the current stream position
    pub fn parse<R: Read + Seek>(reader: &mut R) -> ArchiveResult<Self> {
        Self::read_le(reader).map_err(|e| ArchiveError::decode("entry", e))
    }

    /// Write the record at the current stream position
    pub fn build<W: Write + Seek>(&self, writer: &mut W) -> ArchiveResult<()> {
        self.write_le(writer).map_err(ArchiveError::encode)
    }

    /// Serialize to the on-disk form
    pub fn to_bytes(&self) -> ArchiveResult<Vec<u8>> {
        let mut buffer = Vec::new();
        self.build(&mut Cursor::new(&mut buffer))?;
        Ok(buffer)
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation
fn read_block<R: Read>(reader: &mut R, len: u32) -> BinResult<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(u64::from(len)).read_to_end(&mut bytes)?;
    if bytes.len() != len as usize {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(bytes)
}

fn read_string<R: Read + Seek>(reader: &mut R, endian: Endian) -> BinResult<String> {
    let len = u32::read_options(reader, endian, ())?;
    let bytes = read_block(reader, len)?;
    String::from_utf8(bytes).map_err(|e| binrw::Error::Custom {
        pos: reader.stream_position().unwrap_or(0),
        err: Box::new(e),
    })
}

fn write_string<W: Write + Seek>(writer: &mut W, endian: Endian, value: &str) -> BinResult<()> {
    let len = u32::try_from(value.len()).map_err(|_| binrw::Error::Custom {
        pos: writer.stream_position().unwrap_or(0),
        err: Box::new(format!("string of {} bytes exceeds u32 length", value.len())),
    })?;
    len.write_options(writer, endian, ())?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

impl BinRead for ArchiveEntry {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let hash_a = u64::read_options(reader, endian, ())?;
        let hash_b = u64::read_options(reader, endian, ())?;
        let sequence_index = u32::read_options(reader, endian, ())?;
        let name = read_string(reader, endian)?;
        let modification_time = u32::read_options(reader, endian, ())?;
        let digest = read_string(reader, endian)?;
        let data_offset = u32::read_options(reader, endian, ())?;
        let data_size = u32::read_options(reader, endian, ())?;

        Ok(Self {
            hash_a,
            hash_b,
            sequence_index,
            name,
            modification_time,
            digest,
            data_offset,
            data_size,
        })
    }
}

impl BinWrite for ArchiveEntry {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.hash_a.write_options(writer, endian, ())?;
        self.hash_b.write_options(writer, endian, ())?;
        self.sequence_index.write_options(writer, endian, ())?;
        write_string(writer, endian, &self.name)?;
        self.modification_time.write_options(writer, endian, ())?;
        write_string(writer, endian, &self.digest)?;
        self.data_offset.write_options(writer, endian, ())?;
        self.data_size.write_options(writer, endian, ())?;
        Ok(())
    }
}
