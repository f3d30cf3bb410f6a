//! Incremental container updates
//!
//! An update walks the source tree, compares every file by content digest
//! against the merged entry tables of the containers already in the
//! container directory, and packs only the new and changed files into one
//! more container.
//!
//! Two source files whose names differ only in ASCII case hash to the same
//! lookup key and cannot share a container. The first one in walk order is
//! packed and the other is skipped with a warning.
//!
//! ```rust,no_run
//! use mpyq_crypto::CryptTable;
//! use mpyq_packer::{IgnorePolicy, IncrementalUpdater};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let table = CryptTable::new();
//! let updater = IncrementalUpdater::new(&table).with_ignore(IgnorePolicy::default());
//!
//! let report = updater.update("res", "containers", "containers/res_1700000000.mpq")?;
//! println!("{} added, {} changed", report.added.len(), report.changed.len());
//! # Ok(())
//! # }
//! ```

use crate::error::{PackerError, Result};
use crate::ignore::IgnorePolicy;
use crate::merge::{MergedIndex, merge_containers};
use mpyq_crypto::CryptTable;
use mpyq_formats::archive::constants::CONTAINER_SUFFIX;
use mpyq_formats::archive::{ArchiveError, ArchiveHeader, ArchiveWriter};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// How a source file relates to the merged container state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Not present in any container
    Added,
    /// Present with a different digest
    Changed,
    /// Present with the same digest
    Unchanged,
}

/// Outcome of a successful update
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Container that was written
    pub output: PathBuf,
    /// Header of the written container
    pub header: ArchiveHeader,
    /// Logical names packed for the first time
    pub added: Vec<String>,
    /// Logical names packed again with new content
    pub changed: Vec<String>,
    /// Number of files skipped because their content is already packed
    pub unchanged: usize,
}

/// Files selected for packing, not yet written
pub struct UpdatePlan<'t> {
    writer: ArchiveWriter<'t>,
    added: Vec<String>,
    changed: Vec<String>,
    unchanged: usize,
}

impl UpdatePlan<'_> {
    /// Logical names that are not in any container yet
    pub fn added(&self) -> &[String] {
        &self.added
    }

    /// Logical names whose content differs from the newest packed version
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    /// Number of files whose content is already packed
    pub fn unchanged(&self) -> usize {
        self.unchanged
    }

    /// Check if the plan would write anything
    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Write the container.
    ///
    /// An empty plan fails with [`PackerError::NothingToPackage`] and leaves
    /// no file behind. A file already at the output path is left untouched.
    /// Any other failure removes the partially written container.
    pub fn commit(self) -> Result<UpdateReport> {
        let output = self.writer.output_path().to_path_buf();

        let header = match self.writer.finalize() {
            Ok(header) => header,
            Err(ArchiveError::EmptyArchive) => return Err(PackerError::NothingToPackage),
            Err(e @ ArchiveError::OutputExists(_)) => return Err(e.into()),
            Err(e) => {
                discard_partial(&output);
                return Err(e.into());
            }
        };

        Ok(UpdateReport {
            output,
            header,
            added: self.added,
            changed: self.changed,
            unchanged: self.unchanged,
        })
    }
}

fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial container {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial container {}: {}", path.display(), e),
    }
}

/// Packs the difference between a source tree and existing containers
#[derive(Debug, Clone)]
pub struct IncrementalUpdater<'t> {
    table: &'t CryptTable,
    ignore: IgnorePolicy,
    suffix: String,
}

impl<'t> IncrementalUpdater<'t> {
    /// Create an updater with the default ignore policy and suffix
    pub fn new(table: &'t CryptTable) -> Self {
        Self {
            table,
            ignore: IgnorePolicy::default(),
            suffix: CONTAINER_SUFFIX.to_string(),
        }
    }

    /// Set the ignore policy
    pub fn with_ignore(mut self, ignore: IgnorePolicy) -> Self {
        self.ignore = ignore;
        self
    }

    /// Set the container file suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Merge the entry tables of every container below `container_dir`
    pub fn merge(&self, container_dir: &Path) -> Result<MergedIndex> {
        merge_containers(container_dir, &self.suffix, self.table)
    }

    /// Compare the source tree against a merged index and stage every new
    /// or changed file
    pub fn plan(
        &self,
        merged: &MergedIndex,
        source_root: &Path,
        output_path: &Path,
    ) -> Result<UpdatePlan<'t>> {
        if !source_root.is_dir() {
            return Err(PackerError::MissingDirectory(source_root.to_path_buf()));
        }

        let mut plan = UpdatePlan {
            writer: ArchiveWriter::new(source_root, output_path, self.table),
            added: Vec::new(),
            changed: Vec::new(),
            unchanged: 0,
        };

        let walker = WalkDir::new(source_root)
            .follow_links(true)
            .sort_by_file_name();
        for dir_entry in walker {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type().is_file() || dir_entry.path() == output_path {
                continue;
            }

            let Ok(relative) = dir_entry.path().strip_prefix(source_root) else {
                continue;
            };
            if self.ignore.is_ignored(relative) {
                debug!("Ignoring {}", relative.display());
                continue;
            }
            let Some(name) = logical_name(relative) else {
                warn!("Skipping {}: name is not valid UTF-8", relative.display());
                continue;
            };

            let entry = plan.writer.stage(&name)?;
            let change = match merged.get(&name) {
                None => Change::Added,
                Some(current) if current.entry.digest == entry.digest => Change::Unchanged,
                Some(_) => Change::Changed,
            };

            if change == Change::Unchanged {
                plan.unchanged += 1;
                continue;
            }

            match plan.writer.add(entry) {
                Ok(()) => {}
                Err(ArchiveError::DuplicateEntry(_)) => {
                    warn!("Skipping {}: name collides with an entry already staged", name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            if change == Change::Added {
                debug!("Adding {}", name);
                plan.added.push(name);
            } else {
                debug!("Updating {}", name);
                plan.changed.push(name);
            }
        }

        info!(
            "{} added, {} changed, {} unchanged",
            plan.added.len(),
            plan.changed.len(),
            plan.unchanged
        );
        Ok(plan)
    }

    /// Merge, diff and write one update container
    ///
    /// Fails with [`PackerError::NothingToPackage`] when every file is
    /// already packed with the same content.
    pub fn update<S, C, O>(&self, source_root: S, container_dir: C, output_path: O) -> Result<UpdateReport>
    where
        S: AsRef<Path>,
        C: AsRef<Path>,
        O: AsRef<Path>,
    {
        let merged = self.merge(container_dir.as_ref())?;
        let plan = self.plan(&merged, source_root.as_ref(), output_path.as_ref())?;
        plan.commit()
    }
}

/// Relative path joined with `/`, or `None` if a component is not UTF-8
pub fn logical_name(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
