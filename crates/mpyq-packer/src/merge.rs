//! Merged view over the entry tables of several containers
//!
//! Every container written by the packer only holds the files that changed
//! since the previous ones, so the current state of a resource tree is the
//! union of all containers with the newest entry winning for each logical
//! name.

use crate::error::{PackerError, Result};
use mpyq_crypto::CryptTable;
use mpyq_formats::archive::{ArchiveEntry, ArchiveReader};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Newest known version of one logical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedEntry {
    /// Entry record as stored in its container
    pub entry: ArchiveEntry,
    /// Index of the owning container in [`MergedIndex::containers`]
    pub container: usize,
}

/// Union of container entry tables keyed by logical name.
///
/// Containers are registered in sorted path order. For each name the entry
/// with the larger modification time wins; on equal times the container
/// registered later wins, which is the lexicographically later path.
#[derive(Debug, Clone, Default)]
pub struct MergedIndex {
    containers: Vec<PathBuf>,
    entries: BTreeMap<String, MergedEntry>,
}

impl MergedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container and merge its entries, returning its index
    pub fn merge<'a, I>(&mut self, container: impl Into<PathBuf>, entries: I) -> usize
    where
        I: IntoIterator<Item = &'a ArchiveEntry>,
    {
        let index = self.containers.len();
        self.containers.push(container.into());

        for entry in entries {
            match self.entries.get(&entry.name) {
                Some(current) if !Self::supersedes(entry, index, current) => {
                    debug!("Keeping {} from container {}", entry.name, current.container);
                }
                _ => {
                    self.entries.insert(
                        entry.name.clone(),
                        MergedEntry {
                            entry: entry.clone(),
                            container: index,
                        },
                    );
                }
            }
        }

        index
    }

    fn supersedes(candidate: &ArchiveEntry, container: usize, current: &MergedEntry) -> bool {
        (candidate.modification_time, container)
            >= (current.entry.modification_time, current.container)
    }

    /// Look up the newest entry for a logical name
    pub fn get(&self, name: &str) -> Option<&MergedEntry> {
        self.entries.get(name)
    }

    /// Check if a logical name is known
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate over the merged entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MergedEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Registered container paths, in registration order
    pub fn containers(&self) -> &[PathBuf] {
        &self.containers
    }

    /// Path of a registered container
    pub fn container_path(&self, index: usize) -> Option<&Path> {
        self.containers.get(index).map(PathBuf::as_path)
    }

    /// Number of distinct logical names
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no names are known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect every container below `dir` whose file name ends with `suffix`,
/// sorted by path.
pub fn find_containers(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PackerError::MissingDirectory(dir.to_path_buf()));
    }

    let mut containers = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(suffix));
        if matches {
            containers.push(entry.into_path());
        }
    }

    containers.sort();
    Ok(containers)
}

/// Open every container below `dir` and merge their entry tables.
///
/// Containers are opened one at a time and closed after their table is
/// merged. A container that fails to open aborts the merge.
pub fn merge_containers(dir: &Path, suffix: &str, table: &CryptTable) -> Result<MergedIndex> {
    let mut index = MergedIndex::new();

    for path in find_containers(dir, suffix)? {
        let reader =
            ArchiveReader::open(&path, table).map_err(|e| PackerError::container(&path, e))?;
        debug!("Merging {} entries from {}", reader.len(), path.display());
        index.merge(path, reader.entries());
    }

    info!(
        "Merged {} containers into {} entries",
        index.containers().len(),
        index.len()
    );
    Ok(index)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use mpyq_crypto::NameHash;

    fn entry(name: &str, modification_time: u32, digest: &str) -> ArchiveEntry {
        let (hash_a, hash_b) = NameHash::new(1, 2).as_wide();
        ArchiveEntry {
            hash_a,
            hash_b,
            sequence_index: 1,
            name: name.to_string(),
            modification_time,
            digest: digest.to_string(),
            data_offset: 0,
            data_size: 0,
        }
    }

    #[test]
    fn test_newer_entry_wins() {
        let mut index = MergedIndex::new();
        index.merge("a.mpq", &[entry("x", 200, "new")]);
        index.merge("b.mpq", &[entry("x", 100, "old")]);

        let merged = index.get("x").expect("entry should exist");
        assert_eq!(merged.entry.digest, "new");
        assert_eq!(merged.container, 0);
        assert_eq!(index.container_path(0), Some(Path::new("a.mpq")));
    }

    #[test]
    fn test_tie_goes_to_later_container() {
        let mut index = MergedIndex::new();
        index.merge("a.mpq", &[entry("x", 100, "first")]);
        index.merge("b.mpq", &[entry("x", 100, "second")]);

        let merged = index.get("x").expect("entry should exist");
        assert_eq!(merged.entry.digest, "second");
        assert_eq!(merged.container, 1);
    }

    #[test]
    fn test_union_of_names() {
        let mut index = MergedIndex::new();
        index.merge("a.mpq", &[entry("x", 1, "x"), entry("y", 1, "y")]);
        index.merge("b.mpq", &[entry("z", 1, "z")]);

        let names: Vec<&str> = index.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(index.len(), 3);
        assert!(index.contains("z"));
        assert!(!index.contains("w"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().expect("Operation should succeed");
        let missing = dir.path().join("nope");
        let err = find_containers(&missing, ".mpq").expect_err("missing dir should fail");
        assert!(matches!(err, PackerError::MissingDirectory(_)));
    }

    #[test]
    fn test_find_containers_filters_and_sorts() {
        let dir = tempfile::tempdir().expect("Operation should succeed");
        std::fs::create_dir_all(dir.path().join("nested")).expect("Operation should succeed");
        for name in ["res_2.mpq", "res_1.mpq", "notes.txt", "nested/res_0.mpq"] {
            std::fs::write(dir.path().join(name), b"").expect("Operation should succeed");
        }

        let found = find_containers(dir.path(), ".mpq").expect("Operation should succeed");
        let expected = vec![
            dir.path().join("nested/res_0.mpq"),
            dir.path().join("res_1.mpq"),
            dir.path().join("res_2.mpq"),
        ];
        assert_eq!(found, expected);
    }
}
