//! Exposing an environment's executables in the shared bin directory.
//!
//! Two strategies exist: symlinks (Unix) and plain copies (Windows, where a
//! symlinked `.exe` launcher does not find its environment). The strategy is
//! picked at compile time through [`DefaultPublisher`].

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, is_path_under, real_link_target, real_path};

/// How environment executables are exposed in the bin directory.
pub trait Publisher {
    /// Make `dest` provide `source`. Returns whether `dest` now does.
    /// Failures are reported and swallowed.
    fn publish<R: Runtime>(&self, runtime: &R, source: &Path, dest: &Path) -> bool;

    /// Whether a discovered file is something this strategy can expose.
    fn is_publishable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool;

    /// Concrete files to consider for one manifest entry.
    fn variants<R: Runtime>(&self, runtime: &R, path: &Path) -> Vec<PathBuf>;

    /// Whether the published `dest` still belongs to the environment at `env_root`.
    fn owns<R: Runtime>(&self, runtime: &R, dest: &Path, env_root: &Path) -> bool;
}

#[cfg(windows)]
pub type DefaultPublisher = CopyPublisher;
#[cfg(not(windows))]
pub type DefaultPublisher = SymlinkPublisher;

/// Publishes by symlinking `dest -> source`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymlinkPublisher;

impl Publisher for SymlinkPublisher {
    #[tracing::instrument(skip(self, runtime))]
    fn publish<R: Runtime>(&self, runtime: &R, source: &Path, dest: &Path) -> bool {
        if real_link_target(runtime, dest).as_deref() == Some(source) {
            debug!("{:?} already points to {:?}", dest, source);
            return true;
        }

        if runtime.is_symlink(dest) {
            // May already be gone if another process got there first.
            let _ = runtime.remove_symlink(dest);
        } else if runtime.exists(dest) {
            println!(
                "  Skipping {}: it exists and is not a symlink",
                dest.display()
            );
            return false;
        }

        match runtime.symlink(source, dest) {
            Ok(()) => {
                println!("  Linked script {}", dest.display());
                true
            }
            Err(e) => {
                warn!("Failed to link {:?} -> {:?}: {}", dest, source, e);
                false
            }
        }
    }

    fn is_publishable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool {
        runtime.is_executable(path)
    }

    fn variants<R: Runtime>(&self, _runtime: &R, path: &Path) -> Vec<PathBuf> {
        vec![path.to_path_buf()]
    }

    fn owns<R: Runtime>(&self, runtime: &R, dest: &Path, env_root: &Path) -> bool {
        let prefix = real_path(runtime, env_root);
        real_link_target(runtime, dest).is_some_and(|target| is_path_under(&target, &prefix))
    }
}

/// Publishes by copying `source` over `dest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyPublisher;

impl Publisher for CopyPublisher {
    #[tracing::instrument(skip(self, runtime))]
    fn publish<R: Runtime>(&self, runtime: &R, source: &Path, dest: &Path) -> bool {
        match runtime.copy(source, dest) {
            Ok(_) => {
                println!("  Copied executable {}", dest.display());
                true
            }
            Err(e) => {
                warn!("Failed to copy {:?} to {:?}: {}", source, dest, e);
                false
            }
        }
    }

    fn is_publishable<R: Runtime>(&self, runtime: &R, path: &Path) -> bool {
        runtime.is_file(path)
    }

    /// A manifest entry `tool` may be installed as `tool.exe`, `tool-script.py`, ...
    fn variants<R: Runtime>(&self, runtime: &R, path: &Path) -> Vec<PathBuf> {
        let mut found = vec![path.to_path_buf()];
        let pattern = format!("{}*", glob::Pattern::escape(&path.to_string_lossy()));
        match runtime.glob(&pattern) {
            Ok(matches) => {
                for candidate in matches {
                    if !found.contains(&candidate) {
                        found.push(candidate);
                    }
                }
            }
            Err(e) => debug!("Could not expand {}: {}", pattern, e),
        }
        found
    }

    fn owns<R: Runtime>(&self, runtime: &R, dest: &Path, _env_root: &Path) -> bool {
        // Copies carry no link back to their environment.
        runtime.is_file(dest)
    }
}
