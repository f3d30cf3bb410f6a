//! MPYQ packer binary entry point.
//!
//! This is a thin wrapper around the mpyq-packer library that:
//! 1. Initializes logging
//! 2. Loads and validates configuration
//! 3. Runs the selected mode and reports the outcome
//!
//! For library usage, see the mpyq-packer crate documentation.

use anyhow::{Result, bail};
use mpyq_packer::{Outcome, Packer, PackerConfig};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse configuration from CLI args
    let config = PackerConfig::from_args();

    tracing::info!(
        "Configuration loaded: containers={:?}, resources={:?}, mode={:?}",
        config.container_dir,
        config.resource_dir,
        config.mode()
    );

    // Validate configuration
    config.validate()?;

    match Packer::new(config).run()? {
        Outcome::Packed(report) => {
            tracing::info!(
                "Wrote {} ({} added, {} changed, {} unchanged)",
                report.output.display(),
                report.added.len(),
                report.changed.len(),
                report.unchanged
            );
        }
        Outcome::UpToDate => {
            tracing::info!("No changes to package");
        }
        Outcome::Extracted(report) => {
            for failure in &report.failures {
                tracing::error!("{}: {}", failure.name, failure.error);
            }
            if !report.is_complete() {
                bail!("{} resources failed to extract", report.failures.len());
            }
            tracing::info!("Extracted {} resources", report.extracted.len());
        }
        Outcome::Listed(listing) => {
            for item in listing {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    item.name,
                    item.size,
                    item.modification_time,
                    item.digest,
                    item.container.display()
                );
            }
        }
    }

    Ok(())
}
