//! Package management
//!
//! Specifier handling, per-environment metadata, script discovery and the
//! [`Repo`] lifecycle manager that ties them together.

mod discovery;
mod info;
mod repository;
mod spec;
mod uninstall;

pub use repository::{
    InstallOptions, InstallOutcome, InstalledPackage, LifecycleError, Repo, UpgradeOutcome,
};
pub use spec::SpecError;
pub use uninstall::UninstallPlan;
