//! Incremental packer for MPYQ resource containers.
//!
//! A resource directory is packed into a growing set of containers: each
//! run writes one new container holding only the files that are new or
//! whose content changed since the containers already present. Readers see
//! the union of all containers with the newest version of each file.
//!
//! # Architecture
//!
//! - `merge`: union of container entry tables, newest entry wins
//! - `updater`: source tree diff and update container writing
//! - `ignore`: source files left out of packing
//! - `resource`: read access to every container as one tree
//! - `config`: CLI configuration loading and validation
//! - `packer`: runs the configured mode
//!
//! # Example
//!
//! ```no_run
//! use mpyq_packer::{Outcome, Packer, PackerConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let config = PackerConfig::from_args();
//!     config.validate()?;
//!
//!     if let Outcome::Packed(report) = Packer::new(config).run()? {
//!         println!("Wrote {}", report.output.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Module declarations
pub mod config;
pub mod error;
pub mod ignore;
pub mod merge;
pub mod packer;
pub mod resource;
pub mod updater;

// Re-exports for public API
pub use config::{Mode, PackerConfig};
pub use error::{ConfigError, PackerError, Result};
pub use ignore::IgnorePolicy;
pub use merge::{MergedEntry, MergedIndex, find_containers, merge_containers};
pub use packer::{Listing, Outcome, Packer};
pub use resource::ResourceSystem;
pub use updater::{IncrementalUpdater, UpdatePlan, UpdateReport};
