//! Path utility functions for normalization and comparison.

use std::path::{Component, Path, PathBuf};

use super::Runtime;

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` above the root (or a relative start) is kept verbatim
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Check whether `path` lies inside `dir` (or is `dir`), comparing whole
/// components of the lexically normalized paths.
///
/// `/venvs/grin-extra/bin/x` is NOT under `/venvs/grin`, and
/// `/venvs/grin/../other/bin/x` is NOT under `/venvs/grin`.
pub fn is_path_under(path: &Path, dir: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// The fully resolved form of `path`: canonical when it exists, otherwise
/// the lexically normalized absolute form.
pub fn real_path<R: Runtime>(runtime: &R, path: &Path) -> PathBuf {
    runtime
        .canonicalize(path)
        .unwrap_or_else(|_| normalize_path(path))
}

/// `path` with its parent directory fully resolved and its last component
/// kept as is, so a symlink is named by where it lives rather than where it
/// points.
pub fn real_location<R: Runtime>(runtime: &R, path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => real_path(runtime, parent).join(name),
        _ => real_path(runtime, path),
    }
}

/// Where a symlink finally points, fully resolved, or `None` if `path` is not a
/// readable symlink.
pub fn real_link_target<R: Runtime>(runtime: &R, path: &Path) -> Option<PathBuf> {
    if !runtime.is_symlink(path) {
        return None;
    }
    let target = runtime.resolve_link(path).ok()?;
    Some(real_path(runtime, &target))
}
