//! Container reading and extraction
//!
//! An [`ArchiveReader`] loads the header and the whole entry table when it is
//! opened and keeps the underlying stream for payload reads. Lookups go
//! through a `(hash_a, hash_b)` map built at open time.

use crate::archive::constants::FORMAT_VERSION;
use crate::archive::entry::ArchiveEntry;
use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::archive::header::ArchiveHeader;
use mpyq_crypto::CryptTable;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on the entry capacity reserved before the table is read
const MAX_PREALLOCATED_ENTRIES: usize = 4096;

/// A logical name that could not be extracted
#[derive(Debug)]
pub struct ExtractFailure {
    /// Logical name of the entry
    pub name: String,
    /// Why extraction failed
    pub error: ArchiveError,
}

/// Outcome of a best-effort extraction
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Files written, in extraction order
    pub extracted: Vec<PathBuf>,
    /// Entries that failed, in extraction order
    pub failures: Vec<ExtractFailure>,
}

impl ExtractReport {
    /// Check whether every entry was extracted
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Record the outcome of extracting `name`, logging failures
    pub fn record(&mut self, name: &str, result: ArchiveResult<PathBuf>) {
        match result {
            Ok(path) => self.extracted.push(path),
            Err(error) => {
                warn!("Failed to extract {}: {}", name, error);
                self.failures.push(ExtractFailure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }
}

/// Resolve `name` below `dest_root`, refusing names that would escape it
pub fn destination_path(dest_root: &Path, name: &str) -> ArchiveResult<PathBuf> {
    let mut path = dest_root.to_path_buf();
    let mut has_file = false;

    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                path.push(part);
                has_file = true;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath(name.to_string()));
            }
        }
    }

    if !has_file {
        return Err(ArchiveError::UnsafePath(name.to_string()));
    }
    Ok(path)
}

/// Read-only view of one container
pub struct ArchiveReader<'t, R: Read + Seek> {
    /// Underlying stream
    reader: R,
    /// Table used to hash lookup names
    table: &'t CryptTable,
    /// Decoded header
    header: ArchiveHeader,
    /// Entry table in on-disk order
    entries: Vec<ArchiveEntry>,
    /// Lookup key to position in `entries`
    lookup: HashMap<(u64, u64), usize>,
    /// Source path when opened from disk
    path: Option<PathBuf>,
}

impl<'t, R: Read + Seek> ArchiveReader<'t, R> {
    /// Load header and entry table from a stream
    pub fn new(mut reader: R, table: &'t CryptTable) -> ArchiveResult<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let header = ArchiveHeader::parse(&mut reader)?;

        if header.version != FORMAT_VERSION {
            warn!(
                "Container version {} differs from supported version {}",
                header.version, FORMAT_VERSION
            );
        }

        // Counts past i32::MAX read as negative in signed readers
        if header.entry_count == 0 || i32::try_from(header.entry_count).is_err() {
            return Err(ArchiveError::InvalidEntryCount(header.entry_count));
        }

        reader.seek(SeekFrom::Start(u64::from(header.entry_table_offset)))?;

        let count = header.entry_count as usize;
        let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));
        let mut lookup = HashMap::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));
        let mut names = HashSet::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));

        for index in 0..count {
            let entry = ArchiveEntry::parse(&mut reader)?;
            debug!(
                "Read entry {}: {} (hash_a={:#x}, hash_b={:#x})",
                index, entry.name, entry.hash_a, entry.hash_b
            );

            if !names.insert(entry.name.clone()) || lookup.insert(entry.lookup_key(), index).is_some() {
                return Err(ArchiveError::DuplicateEntry(entry.name));
            }
            entries.push(entry);
        }

        Ok(Self {
            reader,
            table,
            header,
            entries,
            lookup,
            path: None,
        })
    }

    /// Container header
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Entry table in on-disk order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the container has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path the container was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Find an entry by logical name
    ///
    /// Lookup is by name hash only, so it is case-insensitive for ASCII.
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        let key = self.table.name_hash(name).as_wide();
        self.lookup.get(&key).map(|&index| &self.entries[index])
    }

    /// Check if a logical name resolves to an entry
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Read the payload of a logical name
    pub fn read_bytes(&mut self, name: &str) -> ArchiveResult<Vec<u8>> {
        let entry = self
            .find(name)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;
        self.read_entry(&entry)
    }

    /// Read the payload of an entry of this container
    pub fn read_entry(&mut self, entry: &ArchiveEntry) -> ArchiveResult<Vec<u8>> {
        let offset = u64::from(self.header.data_offset) + u64::from(entry.data_offset);
        self.reader.seek(SeekFrom::Start(offset))?;

        let expected = u64::from(entry.data_size);
        let mut data = Vec::new();
        (&mut self.reader).take(expected).read_to_end(&mut data)?;

        if (data.len() as u64) < expected {
            return Err(ArchiveError::ShortRead {
                name: entry.name.clone(),
                expected,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }

    /// Extract one logical name to `dest_root/name`
    ///
    /// The file is written under the requested name even when lookup matched
    /// an entry stored with different ASCII case. Missing parent directories
    /// are created and an existing file is overwritten. Returns the path
    /// written.
    pub fn extract_one(&mut self, name: &str, dest_root: &Path) -> ArchiveResult<PathBuf> {
        let entry = self
            .find(name)
            .cloned()
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;
        let target = destination_path(dest_root, name)?;
        self.write_entry(&entry, target)
    }

    /// Extract an entry of this container to `dest_root/entry.name`
    pub fn extract_entry(&mut self, entry: &ArchiveEntry, dest_root: &Path) -> ArchiveResult<PathBuf> {
        let target = destination_path(dest_root, &entry.name)?;
        self.write_entry(entry, target)
    }

    fn write_entry(&mut self, entry: &ArchiveEntry, target: PathBuf) -> ArchiveResult<PathBuf> {
        let data = self.read_entry(entry)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, data)?;

        debug!("Extracted {} to {}", entry.name, target.display());
        Ok(target)
    }

    /// Extract every entry in table order
    ///
    /// A failing entry is logged and recorded in the report; the remaining
    /// entries are still extracted.
    pub fn extract_all(&mut self, dest_root: &Path) -> ExtractReport {
        let mut report = ExtractReport::default();
        let entries = self.entries.clone();

        for entry in &entries {
            let result = self.extract_entry(entry, dest_root);
            report.record(&entry.name, result);
        }

        report
    }

    /// Release the underlying stream
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<'t> ArchiveReader<'t, BufReader<File>> {
    /// Open a container file
    pub fn open<P: AsRef<Path>>(path: P, table: &'t CryptTable) -> ArchiveResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = Self::new(BufReader::new(file), table)?;
        reader.path = Some(path.to_path_buf());
        debug!(
            "Opened {} with {} entries",
            path.display(),
            reader.entries.len()
        );
        Ok(reader)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::archive::constants::HEADER_SIZE;
    use std::io::Cursor;

    /// Build a container in memory from (name, payload) pairs
    fn container(table: &CryptTable, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut entries = Vec::new();
        let mut offset = 0u32;
        for (index, (name, data)) in files.iter().enumerate() {
            let hash = table.name_hash(name);
            entries.push(ArchiveEntry {
                hash_a: u64::from(hash.a),
                hash_b: u64::from(hash.b),
                sequence_index: index as u32 + 1,
                name: (*name).to_string(),
                modification_time: 1_700_000_000,
                digest: mpyq_crypto::ContentDigest::from_data(data).to_hex(),
                data_offset: offset,
                data_size: data.len() as u32,
            });
            offset += data.len() as u32;
        }

        let table_size: u64 = entries.iter().map(ArchiveEntry::size).sum();
        let payload: u64 = files.iter().map(|(_, d)| d.len() as u64).sum();
        let header =
            ArchiveHeader::new(entries.len(), table_size, payload).expect("Operation should succeed");

        let mut bytes = header.to_bytes().expect("Operation should succeed");
        for entry in &entries {
            bytes.extend(entry.to_bytes().expect("Operation should succeed"));
        }
        for (_, data) in files {
            bytes.extend_from_slice(data);
        }
        bytes
    }

    #[test]
    fn test_find_and_read() {
        let table = CryptTable::new();
        let bytes = container(&table, &[("a.txt", b"hello"), ("sub/b.txt", b"world")]);
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        assert_eq!(reader.len(), 2);
        assert_eq!(reader.header().entry_table_offset as usize, HEADER_SIZE);
        assert!(reader.contains("sub/b.txt"));
        assert!(reader.find("missing.txt").is_none());

        assert_eq!(reader.read_bytes("a.txt").expect("Operation should succeed"), b"hello");
        assert_eq!(reader.read_bytes("sub/b.txt").expect("Operation should succeed"), b"world");
        // ASCII case folds through the hash
        assert_eq!(reader.read_bytes("A.TXT").expect("Operation should succeed"), b"hello");
    }

    #[test]
    fn test_missing_entry() {
        let table = CryptTable::new();
        let bytes = container(&table, &[("a.txt", b"hello")]);
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        assert!(matches!(
            reader.read_bytes("b.txt"),
            Err(ArchiveError::EntryNotFound(name)) if name == "b.txt"
        ));
    }

    #[test]
    fn test_zero_entries_rejected() {
        let table = CryptTable::new();
        let bytes = ArchiveHeader::new(0, 0, 0)
            .expect("Operation should succeed")
            .to_bytes()
            .expect("Operation should succeed");

        assert!(matches!(
            ArchiveReader::new(Cursor::new(bytes), &table),
            Err(ArchiveError::InvalidEntryCount(0))
        ));
    }

    #[test]
    fn test_negative_entry_count_rejected() {
        let table = CryptTable::new();
        let mut bytes = container(&table, &[("a.txt", b"hello")]);
        bytes[16..20].copy_from_slice(&0x8000_0000_u32.to_le_bytes());

        assert!(matches!(
            ArchiveReader::new(Cursor::new(bytes), &table),
            Err(ArchiveError::InvalidEntryCount(0x8000_0000))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let table = CryptTable::new();
        let bytes = container(&table, &[("a.txt", b"one"), ("a.txt", b"two")]);

        assert!(matches!(
            ArchiveReader::new(Cursor::new(bytes), &table),
            Err(ArchiveError::DuplicateEntry(name)) if name == "a.txt"
        ));
    }

    #[test]
    fn test_short_payload() {
        let table = CryptTable::new();
        let mut bytes = container(&table, &[("a.txt", b"hello")]);
        bytes.truncate(bytes.len() - 2);
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        assert!(matches!(
            reader.read_bytes("a.txt"),
            Err(ArchiveError::ShortRead { expected: 5, actual: 3, .. })
        ));
    }

    #[test]
    fn test_destination_path() {
        let root = Path::new("out");
        assert_eq!(
            destination_path(root, "sub/b.txt").expect("Operation should succeed"),
            root.join("sub").join("b.txt")
        );
        assert!(matches!(
            destination_path(root, "../escape.txt"),
            Err(ArchiveError::UnsafePath(_))
        ));
        assert!(matches!(
            destination_path(root, "/etc/passwd"),
            Err(ArchiveError::UnsafePath(_))
        ));
        assert!(matches!(destination_path(root, ""), Err(ArchiveError::UnsafePath(_))));
    }

    #[test]
    fn test_extract_all_continues_after_failure() {
        let table = CryptTable::new();
        let bytes = container(
            &table,
            &[("../evil.txt", b"nope"), ("a.txt", b"hello"), ("sub/b.txt", b"world")],
        );
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        let dir = tempfile::tempdir().expect("Operation should succeed");
        let report = reader.extract_all(dir.path());

        assert!(!report.is_complete());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "../evil.txt");
        assert_eq!(report.extracted.len(), 2);
        assert_eq!(
            fs::read(dir.path().join("sub/b.txt")).expect("Operation should succeed"),
            b"world"
        );
    }

    #[test]
    fn test_extract_one_overwrites() {
        let table = CryptTable::new();
        let bytes = container(&table, &[("a.txt", b"hello")]);
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        let dir = tempfile::tempdir().expect("Operation should succeed");
        fs::write(dir.path().join("a.txt"), b"stale content").expect("Operation should succeed");

        let written = reader
            .extract_one("a.txt", dir.path())
            .expect("Operation should succeed");
        assert_eq!(written, dir.path().join("a.txt"));
        assert_eq!(fs::read(written).expect("Operation should succeed"), b"hello");
    }

    #[test]
    fn test_extract_one_uses_requested_name() {
        let table = CryptTable::new();
        let bytes = container(&table, &[("ui/icon.png", b"pixels")]);
        let mut reader =
            ArchiveReader::new(Cursor::new(bytes), &table).expect("Operation should succeed");

        let dir = tempfile::tempdir().expect("Operation should succeed");
        let written = reader
            .extract_one("UI/Icon.png", dir.path())
            .expect("Operation should succeed");
        assert_eq!(written, dir.path().join("UI/Icon.png"));
        assert_eq!(fs::read(&written).expect("Operation should succeed"), b"pixels");
    }
}
