use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::package::{InstallOptions, InstallOutcome};
use crate::runtime::Runtime;

use super::config::Config;

/// Install a package into its own environment and publish its scripts.
#[tracing::instrument(skip(runtime, config))]
pub fn install<R: Runtime>(
    runtime: R,
    spec: &str,
    python: Option<PathBuf>,
    editable: bool,
    system_site_packages: bool,
    config: Config,
) -> Result<()> {
    let options = InstallOptions {
        python,
        editable,
        system_site_packages,
    };
    debug!("Installing {} with {:?}", spec, options);

    match config.repo(&runtime).install(spec, &options)? {
        InstallOutcome::Installed { .. } => println!("Done."),
        InstallOutcome::AlreadyInstalled { name } => println!("{} is already installed", name),
        InstallOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}
