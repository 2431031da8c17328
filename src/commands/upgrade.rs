use anyhow::Result;

use crate::package::UpgradeOutcome;
use crate::runtime::Runtime;

use super::config::Config;

/// Upgrade an installed package in place.
#[tracing::instrument(skip(runtime, config))]
pub fn upgrade<R: Runtime>(runtime: R, spec: &str, editable: bool, config: Config) -> Result<()> {
    match config.repo(&runtime).upgrade(spec, editable)? {
        UpgradeOutcome::Upgraded { .. } => println!("Done."),
        UpgradeOutcome::NotInstalled { name } => println!("{} is not installed", name),
        UpgradeOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}
