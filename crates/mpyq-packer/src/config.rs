//! Packer configuration management.
//!
//! Configuration comes from CLI arguments with environment variable
//! fallbacks and is checked by [`PackerConfig::validate`] before any
//! container is touched.
//!
//! # Configuration Sources
//!
//! - Positional arguments: container directory, resource directory
//! - Flags (`--decompress`, `--list`, `--ignore`, `--suffix`, `--output`)
//! - Environment variables (`MPYQ_CONTAINER_DIR`, `MPYQ_IGNORE`, etc.)
//!
//! # Example
//!
//! ```no_run
//! use mpyq_packer::PackerConfig;
//!
//! let config = PackerConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! println!("Mode: {:?}", config.mode());
//! ```

use crate::error::ConfigError;
use crate::ignore::IgnorePolicy;
use clap::Parser;
use std::path::{Path, PathBuf};

/// What a run of the packer does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Pack new and changed resources into a new container
    Pack,
    /// Unpack the merged view of all containers
    Extract,
    /// Print the merged view of all containers
    List,
}

/// Packer configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mpyq-packer",
    about = "Incrementally pack resource directories into MPYQ containers",
    version
)]
pub struct PackerConfig {
    /// Directory holding the containers
    #[arg(env = "MPYQ_CONTAINER_DIR")]
    pub container_dir: PathBuf,

    /// Resource directory (packed from, or extracted into with --decompress)
    #[arg(env = "MPYQ_RESOURCE_DIR")]
    pub resource_dir: PathBuf,

    /// Extract all containers into the resource directory
    #[arg(short = 'd', long, conflicts_with = "list")]
    pub decompress: bool,

    /// List the newest version of every packed resource
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Exclude files whose name ends with, or whose directories contain, this token
    #[arg(
        long = "ignore",
        env = "MPYQ_IGNORE",
        value_delimiter = ',',
        default_values = [".meta", ".DS_Store"]
    )]
    pub ignore: Vec<String>,

    /// Container file name suffix
    #[arg(long, env = "MPYQ_SUFFIX", default_value = ".mpq")]
    pub suffix: String,

    /// File name of the new container (default: res_<unix time><suffix>)
    #[arg(short = 'o', long, env = "MPYQ_OUTPUT")]
    pub output: Option<String>,
}

impl PackerConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Selected mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.decompress {
            Mode::Extract
        } else if self.list {
            Mode::List
        } else {
            Mode::Pack
        }
    }

    /// Ignore policy built from the configured tokens
    #[must_use]
    pub fn ignore_policy(&self) -> IgnorePolicy {
        IgnorePolicy::new(self.ignore.iter().cloned())
    }

    /// Path of the container written in pack mode
    #[must_use]
    pub fn output_path(&self, now: u64) -> PathBuf {
        let name = self
            .output
            .clone()
            .unwrap_or_else(|| format!("res_{}{}", now, self.suffix));
        self.container_dir.join(name)
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The container directory doesn't exist
    /// - The resource directory doesn't exist when packing
    /// - The suffix is empty
    /// - The output name is not a plain file name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.container_dir.is_dir() {
            return Err(ConfigError::MissingDirectory(self.container_dir.clone()));
        }

        // Extraction creates the resource directory.
        if self.mode() == Mode::Pack && !self.resource_dir.is_dir() {
            return Err(ConfigError::MissingDirectory(self.resource_dir.clone()));
        }

        if self.suffix.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "suffix",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(output) = &self.output {
            let plain = Path::new(output)
                .file_name()
                .is_some_and(|name| name == output.as_str());
            if !plain {
                return Err(ConfigError::InvalidValue {
                    field: "output",
                    reason: format!("'{output}' must be a file name without directories"),
                });
            }
        }

        Ok(())
    }
}
