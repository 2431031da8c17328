use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

/// Name of the executable directory inside an environment.
#[cfg(windows)]
const BIN_DIR_NAME: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR_NAME: &str = "bin";

const PACKAGE_INFO_FILE: &str = "package_info.json";

/// Paths inside one isolated environment rooted at `<home>/<normalized-name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    root: PathBuf,
}

impl EnvLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/bin` (`<root>\Scripts` on Windows)
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR_NAME)
    }

    pub fn executable(&self, name: &str) -> PathBuf {
        self.bin_dir().join(format!("{}{}", name, EXE_SUFFIX))
    }

    pub fn python(&self) -> PathBuf {
        self.executable("python")
    }

    pub fn pip(&self) -> PathBuf {
        self.executable("pip")
    }

    /// The metadata record written after install/upgrade.
    pub fn info_file(&self) -> PathBuf {
        self.root.join(PACKAGE_INFO_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn test_layout_paths() {
        let layout = EnvLayout::new("/home/user/.local/venvs/grin");

        assert_eq!(layout.root(), Path::new("/home/user/.local/venvs/grin"));
        assert_eq!(
            layout.bin_dir(),
            PathBuf::from("/home/user/.local/venvs/grin/bin")
        );
        assert_eq!(
            layout.python(),
            PathBuf::from("/home/user/.local/venvs/grin/bin/python")
        );
        assert_eq!(
            layout.pip(),
            PathBuf::from("/home/user/.local/venvs/grin/bin/pip")
        );
        assert_eq!(
            layout.info_file(),
            PathBuf::from("/home/user/.local/venvs/grin/package_info.json")
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_layout_paths() {
        let layout = EnvLayout::new(r"C:\Users\user\.local\venvs\grin");

        assert_eq!(
            layout.python(),
            PathBuf::from(r"C:\Users\user\.local\venvs\grin\Scripts\python.exe")
        );
        assert_eq!(
            layout.pip(),
            PathBuf::from(r"C:\Users\user\.local\venvs\grin\Scripts\pip.exe")
        );
    }
}
