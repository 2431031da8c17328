//! Home directory and executable lookup.

use std::path::PathBuf;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn home_dir_impl(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn which_impl(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }
}
