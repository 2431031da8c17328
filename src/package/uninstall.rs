use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// What uninstalling a package would remove. Building a plan never touches
/// the filesystem; [`UninstallPlan::perform`] does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallPlan {
    pub package: String,
    pub paths: Vec<PathBuf>,
    pub installed: bool,
}

impl UninstallPlan {
    pub fn not_installed(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            paths: Vec::new(),
            installed: false,
        }
    }

    pub fn new(package: impl Into<String>, paths: Vec<PathBuf>) -> Self {
        Self {
            package: package.into(),
            paths,
            installed: true,
        }
    }

    /// Remove every planned path. Failures are ignored: a half-removed
    /// environment is replaced by the next install.
    #[tracing::instrument(skip(self, runtime), fields(package = %self.package))]
    pub fn perform<R: Runtime>(&self, runtime: &R) {
        for path in &self.paths {
            let result = if runtime.is_symlink(path) {
                runtime.remove_symlink(path)
            } else if runtime.is_dir(path) {
                runtime.remove_dir_all(path)
            } else {
                runtime.remove_file(path)
            };
            if let Err(e) = result {
                debug!("Could not remove {:?}: {}", path, e);
            }
        }
    }
}
