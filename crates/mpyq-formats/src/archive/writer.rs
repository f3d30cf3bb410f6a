//! Container writer
//!
//! The writer collects entries in memory and emits the whole container in a
//! single pass when finalized:
//!
//! ```text
//! [header][entry 1]...[entry n][payload 1]...[payload n]
//! ```
//!
//! Payloads are not buffered. Each source file is re-read from disk while
//! the data region is written, so memory stays bounded by the entry table
//! and one copy buffer.
//!
//! The writer enforces the same uniqueness rule as the reader: no two
//! entries may share a logical name or a `(hash_a, hash_b)` lookup key.
//! Names that differ only in ASCII case share a key.

use crate::archive::entry::ArchiveEntry;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::header::ArchiveHeader;
use mpyq_crypto::{ContentDigest, CryptTable};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// An entry committed to the container with the file that backs it
#[derive(Debug, Clone)]
struct StagedFile {
    entry: ArchiveEntry,
    source: PathBuf,
}

/// Current time as Unix seconds, clamped to the u32 field
fn unix_now() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Builder for container files
///
/// `stage` describes a file below the source root, `add` commits it, and
/// `finalize` consumes the writer and produces the container. A writer can
/// only be finalized once.
pub struct ArchiveWriter<'t> {
    /// Table used to hash logical names
    table: &'t CryptTable,
    /// Directory logical names are resolved against
    source_root: PathBuf,
    /// Container file produced by `finalize`
    output_path: PathBuf,
    /// Committed entries in add order
    staged: Vec<StagedFile>,
    /// Logical names already committed
    names: HashSet<String>,
    /// Lookup keys already committed
    keys: HashSet<(u64, u64)>,
    /// Next sequence index handed out by `stage`
    next_index: u32,
    /// Data region offset of the next committed payload
    running_offset: u64,
}

impl<'t> ArchiveWriter<'t> {
    /// Create an empty writer
    pub fn new<S: AsRef<Path>, O: AsRef<Path>>(
        source_root: S,
        output_path: O,
        table: &'t CryptTable,
    ) -> Self {
        Self {
            table,
            source_root: source_root.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            staged: Vec::new(),
            names: HashSet::new(),
            keys: HashSet::new(),
            next_index: 1,
            running_offset: 0,
        }
    }

    /// Describe `source_root/name` as an entry
    ///
    /// Hashes the name, digests the file content and takes the current time
    /// as modification time. The returned entry's `data_offset` is only
    /// provisional until the entry is passed to [`ArchiveWriter::add`].
    pub fn stage(&mut self, name: &str) -> ArchiveResult<ArchiveEntry> {
        let source = self.source_root.join(name);

        let metadata = match fs::metadata(&source) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(ArchiveError::SourceFileMissing(source)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ArchiveError::SourceFileMissing(source));
            }
            Err(source_err) => {
                return Err(ArchiveError::SourceRead {
                    path: source,
                    source: source_err,
                });
            }
        };

        let data_size = u32::try_from(metadata.len())
            .map_err(|_| ArchiveError::ArchiveTooLarge(metadata.len()))?;
        let data_offset = u32::try_from(self.running_offset)
            .map_err(|_| ArchiveError::ArchiveTooLarge(self.running_offset))?;

        let digest = ContentDigest::from_file(&source).map_err(|e| ArchiveError::SourceRead {
            path: source.clone(),
            source: e,
        })?;

        let (hash_a, hash_b) = self.table.name_hash(name).as_wide();
        let sequence_index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);

        Ok(ArchiveEntry {
            hash_a,
            hash_b,
            sequence_index,
            name: name.to_string(),
            modification_time: unix_now(),
            digest: digest.to_hex(),
            data_offset,
            data_size,
        })
    }

    /// Commit an entry at the current end of the data region
    ///
    /// The entry's `data_offset` is rewritten to its committed position. Add
    /// order is the payload order of the finished container. An entry whose
    /// name or lookup key is already committed fails with
    /// [`ArchiveError::DuplicateEntry`] and leaves the writer unchanged.
    pub fn add(&mut self, mut entry: ArchiveEntry) -> ArchiveResult<()> {
        if self.names.contains(&entry.name) || self.keys.contains(&entry.lookup_key()) {
            return Err(ArchiveError::DuplicateEntry(entry.name));
        }

        entry.data_offset = u32::try_from(self.running_offset)
            .map_err(|_| ArchiveError::ArchiveTooLarge(self.running_offset))?;
        self.running_offset += u64::from(entry.data_size);

        debug!(
            "Added {} at offset {} ({} bytes)",
            entry.name, entry.data_offset, entry.data_size
        );

        let source = self.source_root.join(&entry.name);
        self.names.insert(entry.name.clone());
        self.keys.insert(entry.lookup_key());
        self.staged.push(StagedFile { entry, source });
        Ok(())
    }

    /// Stage and commit a file in one step
    pub fn add_file(&mut self, name: &str) -> ArchiveResult<ArchiveEntry> {
        let entry = self.stage(name)?;
        self.add(entry)?;
        // The committed copy carries the final offset
        Ok(self.staged[self.staged.len() - 1].entry.clone())
    }

    /// Committed entries in add order
    pub fn entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.staged.iter().map(|staged| &staged.entry)
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Check if no entry has been committed
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Directory logical names are resolved against
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Container file written by `finalize`
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Header describing the committed entries
    pub fn layout(&self) -> ArchiveResult<ArchiveHeader> {
        let entry_table_size: u64 = self.entries().map(ArchiveEntry::size).sum();
        ArchiveHeader::new(self.staged.len(), entry_table_size, self.running_offset)
    }

    /// Write the container to the output path
    ///
    /// Fails with [`ArchiveError::EmptyArchive`] before touching the output
    /// path if nothing was added, and with [`ArchiveError::OutputExists`]
    /// if a file is already there. Existing files are never overwritten.
    /// Any later failure leaves a partial file that the caller must discard.
    pub fn finalize(self) -> ArchiveResult<ArchiveHeader> {
        if self.staged.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }
        let header = self.layout()?;

        let output_path = self.output_path.clone();
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&output_path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ArchiveError::OutputExists(output_path.clone()),
                _ => ArchiveError::Io(e),
            })?;
        let mut writer = BufWriter::new(file);
        self.write_container(&mut writer, &header)?;
        writer.flush()?;

        info!(
            "Created {} with {} entries ({} bytes)",
            output_path.display(),
            header.entry_count,
            header.archive_size
        );
        Ok(header)
    }

    /// Write the container to an arbitrary stream instead of the output path
    pub fn finalize_to<W: Write + Seek>(self, mut writer: W) -> ArchiveResult<ArchiveHeader> {
        if self.staged.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }
        let header = self.layout()?;
        self.write_container(&mut writer, &header)?;
        writer.flush()?;
        Ok(header)
    }

    fn write_container<W: Write + Seek>(
        &self,
        writer: &mut W,
        header: &ArchiveHeader,
    ) -> ArchiveResult<()> {
        header.build(writer)?;
        for staged in &self.staged {
            staged.entry.build(writer)?;
        }

        for staged in &self.staged {
            debug!(
                "Writing {} (hash_a={:#x}, hash_b={:#x})",
                staged.entry.name, staged.entry.hash_a, staged.entry.hash_b
            );
            copy_payload(&staged.source, u64::from(staged.entry.data_size), writer)?;
        }
        Ok(())
    }
}

/// Stream exactly `size` bytes of `source` into `writer`
///
/// The source must still be exactly `size` bytes long, otherwise its content
/// no longer matches the staged digest.
fn copy_payload<W: Write>(source: &Path, size: u64, writer: &mut W) -> ArchiveResult<()> {
    let changed = |kind: io::ErrorKind, detail: String| ArchiveError::SourceRead {
        path: source.to_path_buf(),
        source: io::Error::new(kind, detail),
    };

    let file = File::open(source).map_err(|e| ArchiveError::SourceRead {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut reader = file.take(size);
    let copied = io::copy(&mut reader, writer)?;
    if copied < size {
        return Err(changed(io::ErrorKind::UnexpectedEof, format!(
            "source shrank since staging, {} bytes missing",
            size - copied
        )));
    }

    let mut extra = [0u8; 1];
    if reader.into_inner().read(&mut extra)? != 0 {
        return Err(changed(
            io::ErrorKind::InvalidData,
            "source grew since staging".to_string(),
        ));
    }
    Ok(())
}
