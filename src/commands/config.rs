use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::{
    package::Repo,
    platform::DefaultPublisher,
    runtime::{Runtime, real_path},
};

/// Interpreters tried on `PATH`, in order, when none is given.
const PYTHON_CANDIDATES: [&str; 2] = ["python3", "python"];

/// Directories and interpreter shared by every command, resolved once from
/// flags, environment variables and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Holds one environment per installed package.
    pub home: PathBuf,
    /// Where scripts are published.
    pub bin_dir: PathBuf,
    /// Default interpreter for new environments and local project names.
    pub python: PathBuf,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn new<R: Runtime>(
        runtime: &R,
        home: Option<PathBuf>,
        bin_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let (home, bin_dir) = match (home, bin_dir) {
            (Some(home), Some(bin_dir)) => (home, bin_dir),
            (home, bin_dir) => {
                let local = runtime
                    .home_dir()
                    .context("Could not find home directory")?
                    .join(".local");
                (
                    home.unwrap_or_else(|| local.join("venvs")),
                    bin_dir.unwrap_or_else(|| local.join("bin")),
                )
            }
        };

        let home = real_path(runtime, &absolute(&home)?);
        let bin_dir = real_path(runtime, &absolute(&bin_dir)?);
        let python = default_python(runtime);
        debug!("home={:?} bin_dir={:?} python={:?}", home, bin_dir, python);

        Ok(Self {
            home,
            bin_dir,
            python,
        })
    }

    pub fn repo<'a, R: Runtime>(&self, runtime: &'a R) -> Repo<'a, R, DefaultPublisher> {
        Repo::new(
            runtime,
            DefaultPublisher::default(),
            self.home.clone(),
            self.bin_dir.clone(),
            self.python.clone(),
        )
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {:?}", path))
}

/// The first of `python3`, `python` found on `PATH`. Falls back to the bare
/// `python3` so a missing interpreter fails where it is run.
pub fn default_python<R: Runtime>(runtime: &R) -> PathBuf {
    PYTHON_CANDIDATES
        .iter()
        .find_map(|name| runtime.which(name))
        .unwrap_or_else(|| PathBuf::from(PYTHON_CANDIDATES[0]))
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{configure_mock_runtime_basics, test_bin_dir, test_venvs};
    use mockall::predicate::eq;

    #[test]
    fn test_config_defaults() {
        let mut runtime = MockRuntime::new();
        configure_mock_runtime_basics(&mut runtime);
        runtime
            .expect_which()
            .with(eq("python3"))
            .returning(|_| Some(PathBuf::from("/usr/bin/python3")));

        let config = Config::new(&runtime, None, None).unwrap();
        assert_eq!(
            config,
            Config {
                home: test_venvs(),
                bin_dir: test_bin_dir(),
                python: PathBuf::from("/usr/bin/python3"),
            }
        );
    }

    #[test]
    fn test_config_overrides_skip_home_lookup() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().never();
        runtime
            .expect_canonicalize()
            .with(eq(PathBuf::from("/srv/venvs")))
            .returning(|_| Ok(PathBuf::from("/data/venvs")));
        runtime
            .expect_canonicalize()
            .returning(|_| Err(anyhow::anyhow!("No such file or directory")));
        runtime.expect_which().returning(|_| None);

        let config = Config::new(
            &runtime,
            Some(PathBuf::from("/srv/venvs")),
            Some(PathBuf::from("/srv/tools/../bin")),
        )
        .unwrap();
        assert_eq!(config.home, PathBuf::from("/data/venvs"));
        assert_eq!(config.bin_dir, PathBuf::from("/srv/bin"));
        assert_eq!(config.python, PathBuf::from("python3"));
    }

    #[test]
    fn test_config_resolves_both_directories() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_canonicalize()
            .with(eq(PathBuf::from("/home/user/.local/venvs")))
            .returning(|_| Ok(PathBuf::from("/data/user/.local/venvs")));
        runtime
            .expect_canonicalize()
            .with(eq(PathBuf::from("/home/user/.local/bin")))
            .returning(|_| Ok(PathBuf::from("/data/user/.local/bin")));
        runtime.expect_which().returning(|_| None);

        let config = Config::new(&runtime, None, None).unwrap();
        assert_eq!(config.home, PathBuf::from("/data/user/.local/venvs"));
        assert_eq!(config.bin_dir, PathBuf::from("/data/user/.local/bin"));
    }

    #[test]
    fn test_config_missing_home_directory() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().returning(|| None);

        let err = Config::new(&runtime, Some(PathBuf::from("/srv/venvs")), None).unwrap_err();
        assert_eq!(err.to_string(), "Could not find home directory");
    }

    #[test]
    fn test_default_python_falls_back_to_python() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_which()
            .with(eq("python3"))
            .returning(|_| None);
        runtime
            .expect_which()
            .with(eq("python"))
            .returning(|_| Some(PathBuf::from("/usr/local/bin/python")));

        assert_eq!(
            default_python(&runtime),
            PathBuf::from("/usr/local/bin/python")
        );
    }
}
