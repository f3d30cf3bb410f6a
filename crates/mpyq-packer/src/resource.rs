//! Read access to a directory of containers as one resource tree

use crate::error::{PackerError, Result};
use crate::merge::{MergedEntry, MergedIndex, find_containers};
use mpyq_crypto::CryptTable;
use mpyq_formats::archive::{ArchiveReader, ExtractReport};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Every container below a directory, resolved newest-first.
///
/// Each logical name maps to the newest entry across all containers using
/// the same precedence as the update merge. Containers stay open for the
/// lifetime of the system.
pub struct ResourceSystem<'t> {
    readers: Vec<ArchiveReader<'t, BufReader<File>>>,
    index: MergedIndex,
}

impl<'t> ResourceSystem<'t> {
    /// Open every container below `dir` whose file name ends with `suffix`
    pub fn load(dir: &Path, suffix: &str, table: &'t CryptTable) -> Result<Self> {
        let mut readers = Vec::new();
        let mut index = MergedIndex::new();

        for path in find_containers(dir, suffix)? {
            let reader =
                ArchiveReader::open(&path, table).map_err(|e| PackerError::container(&path, e))?;
            debug!("Loaded {} entries from {}", reader.len(), path.display());
            index.merge(path, reader.entries());
            readers.push(reader);
        }

        info!(
            "Loaded {} containers with {} resources",
            readers.len(),
            index.len()
        );
        Ok(Self { readers, index })
    }

    /// Read the newest version of a logical name, `None` if no container
    /// holds it
    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let Some(merged) = self.index.get(name) else {
            return Ok(None);
        };
        let (Some(reader), Some(path)) = (
            self.readers.get_mut(merged.container),
            self.index.container_path(merged.container),
        ) else {
            return Ok(None);
        };

        reader
            .read_entry(&merged.entry)
            .map(Some)
            .map_err(|e| PackerError::container(path, e))
    }

    /// Check if any container holds a logical name
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Newest entry for a logical name
    pub fn entry(&self, name: &str) -> Option<&MergedEntry> {
        self.index.get(name)
    }

    /// Merged view in name order
    pub fn entries(&self) -> impl Iterator<Item = &MergedEntry> {
        self.index.iter().map(|(_, entry)| entry)
    }

    /// Path of the container a merged entry lives in
    pub fn container_path(&self, entry: &MergedEntry) -> Option<&Path> {
        self.index.container_path(entry.container)
    }

    /// Number of loaded containers
    pub fn container_count(&self) -> usize {
        self.readers.len()
    }

    /// Number of distinct logical names
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no container holds any resource
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Write the newest version of every resource below `dest_root`
    ///
    /// Failures are recorded per resource and never stop the remaining
    /// extractions.
    pub fn extract_all(&mut self, dest_root: &Path) -> ExtractReport {
        let mut report = ExtractReport::default();

        for (name, merged) in self.index.iter() {
            let result = match self.readers.get_mut(merged.container) {
                Some(reader) => reader.extract_entry(&merged.entry, dest_root),
                None => Err(mpyq_formats::ArchiveError::EntryNotFound(name.to_string())),
            };
            report.record(name, result);
        }

        info!(
            "Extracted {} resources to {} ({} failed)",
            report.extracted.len(),
            dest_root.display(),
            report.failures.len()
        );
        report
    }
}
