//! Top-level packer runs

use crate::config::{Mode, PackerConfig};
use crate::error::{PackerError, Result};
use crate::resource::ResourceSystem;
use crate::updater::{IncrementalUpdater, UpdateReport};
use mpyq_crypto::CryptTable;
use mpyq_formats::archive::ExtractReport;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// One line of a container listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Logical name
    pub name: String,
    /// Payload size in bytes
    pub size: u32,
    /// Modification time, Unix seconds
    pub modification_time: u32,
    /// MD5 hex digest of the content
    pub digest: String,
    /// Container holding this version
    pub container: PathBuf,
}

/// Result of a packer run
#[derive(Debug)]
pub enum Outcome {
    /// A new container was written
    Packed(UpdateReport),
    /// Every resource was already packed
    UpToDate,
    /// Containers were unpacked into the resource directory
    Extracted(ExtractReport),
    /// Merged view of all containers
    Listed(Vec<Listing>),
}

/// Runs the mode selected by a [`PackerConfig`]
pub struct Packer {
    config: PackerConfig,
    table: CryptTable,
}

impl Packer {
    /// Create a packer for a validated configuration
    pub fn new(config: PackerConfig) -> Self {
        Self {
            config,
            table: CryptTable::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    /// Run the configured mode
    pub fn run(&self) -> Result<Outcome> {
        match self.config.mode() {
            Mode::Pack => self.pack(),
            Mode::Extract => self.extract(),
            Mode::List => self.list(),
        }
    }

    fn pack(&self) -> Result<Outcome> {
        let output = self.config.output_path(unix_now());
        info!(
            "Packing {} into {}",
            self.config.resource_dir.display(),
            output.display()
        );

        let updater = IncrementalUpdater::new(&self.table)
            .with_ignore(self.config.ignore_policy())
            .with_suffix(self.config.suffix.as_str());

        match updater.update(&self.config.resource_dir, &self.config.container_dir, &output) {
            Ok(report) => Ok(Outcome::Packed(report)),
            Err(PackerError::NothingToPackage) => Ok(Outcome::UpToDate),
            Err(e) => Err(e),
        }
    }

    fn extract(&self) -> Result<Outcome> {
        fs::create_dir_all(&self.config.resource_dir)?;
        let mut system = ResourceSystem::load(
            &self.config.container_dir,
            &self.config.suffix,
            &self.table,
        )?;
        Ok(Outcome::Extracted(
            system.extract_all(&self.config.resource_dir),
        ))
    }

    fn list(&self) -> Result<Outcome> {
        let system = ResourceSystem::load(
            &self.config.container_dir,
            &self.config.suffix,
            &self.table,
        )?;

        let listing = system
            .entries()
            .map(|merged| Listing {
                name: merged.entry.name.clone(),
                size: merged.entry.data_size,
                modification_time: merged.entry.modification_time,
                digest: merged.entry.digest.clone(),
                container: system
                    .container_path(merged)
                    .map(PathBuf::from)
                    .unwrap_or_default(),
            })
            .collect();
        Ok(Outcome::Listed(listing))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn config(container_dir: &Path, resource_dir: &Path) -> PackerConfig {
        PackerConfig {
            container_dir: container_dir.to_path_buf(),
            resource_dir: resource_dir.to_path_buf(),
            decompress: false,
            list: false,
            ignore: vec![".meta".to_string()],
            suffix: ".mpq".to_string(),
            output: Some("res_1.mpq".to_string()),
        }
    }

    #[test]
    fn test_pack_list_extract() {
        let containers = tempfile::tempdir().expect("Operation should succeed");
        let resources = tempfile::tempdir().expect("Operation should succeed");
        fs::write(resources.path().join("a.txt"), b"hello").expect("Operation should succeed");
        fs::write(resources.path().join("a.txt.meta"), b"x").expect("Operation should succeed");

        let packed = Packer::new(config(containers.path(), resources.path()))
            .run()
            .expect("Operation should succeed");
        match packed {
            Outcome::Packed(report) => assert_eq!(report.added, vec!["a.txt"]),
            other => panic!("expected Packed, got {other:?}"),
        }

        let mut again = config(containers.path(), resources.path());
        again.output = Some("res_2.mpq".to_string());
        let repacked = Packer::new(again).run().expect("Operation should succeed");
        assert!(matches!(repacked, Outcome::UpToDate));
        assert!(!containers.path().join("res_2.mpq").exists());

        let mut list = config(containers.path(), resources.path());
        list.list = true;
        match Packer::new(list).run().expect("Operation should succeed") {
            Outcome::Listed(listing) => {
                assert_eq!(listing.len(), 1);
                assert_eq!(listing[0].name, "a.txt");
                assert_eq!(listing[0].size, 5);
                assert_eq!(listing[0].digest, "5d41402abc4b2a76b9719d911017c592");
                assert_eq!(listing[0].container, containers.path().join("res_1.mpq"));
            }
            other => panic!("expected Listed, got {other:?}"),
        }

        let unpacked = tempfile::tempdir().expect("Operation should succeed");
        let target = unpacked.path().join("out");
        let mut extract = config(containers.path(), &target);
        extract.decompress = true;
        match Packer::new(extract).run().expect("Operation should succeed") {
            Outcome::Extracted(report) => assert!(report.is_complete()),
            other => panic!("expected Extracted, got {other:?}"),
        }
        assert_eq!(fs::read(target.join("a.txt")).expect("Operation should succeed"), b"hello");
    }
}
