//! The package lifecycle manager.
//!
//! A [`Repo`] owns two directories: `home`, holding one isolated environment
//! per installed package, and `bin_dir`, where each environment's scripts are
//! published. Install, upgrade, uninstall and listing all go through it.
//!
//! Concurrent invocations against the same directories are not coordinated.
//! The only guard is the exclusive creation of the environment directory, so
//! two installs of one package cannot both populate it.

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::platform::{EnvLayout, Publisher};
use crate::runtime::{
    Invocation, Runtime, is_path_under, real_link_target, real_location, real_path,
};

use super::discovery::{find_scripts, installed_version};
use super::info::PackageInfo;
use super::spec::{SpecError, normalize_package, project_name, resolve};
use super::uninstall::UninstallPlan;

/// Why an install or upgrade stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Failed to create virtualenv.  Aborting.")]
    CreateEnvironment,
    #[error("Failed to pip install.  Aborting.")]
    InstallPackage,
    #[error("Failed to upgrade through pip.  Aborting.")]
    UpgradePackage,
    #[error("Did not find any scripts.  Uninstalling.")]
    NoScripts,
    #[error("{0}")]
    Filesystem(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { name: String, scripts: Vec<PathBuf> },
    AlreadyInstalled { name: String },
    Failed(LifecycleError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded { name: String, scripts: Vec<PathBuf> },
    NotInstalled { name: String },
    Failed(LifecycleError),
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Interpreter for the new environment; the repository default when unset.
    pub python: Option<PathBuf>,
    pub editable: bool,
    pub system_site_packages: bool,
}

/// One entry of [`Repo::list_everything`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub scripts: Vec<PathBuf>,
    pub version: Option<String>,
}

pub struct Repo<'a, R: Runtime, P: Publisher> {
    runtime: &'a R,
    publisher: P,
    home: PathBuf,
    bin_dir: PathBuf,
    python: PathBuf,
}

impl<'a, R: Runtime, P: Publisher> Repo<'a, R, P> {
    pub fn new(
        runtime: &'a R,
        publisher: P,
        home: PathBuf,
        bin_dir: PathBuf,
        python: PathBuf,
    ) -> Self {
        Self {
            runtime,
            publisher,
            home,
            bin_dir,
            python,
        }
    }

    /// `<home>/<normalized name>`
    pub fn package_layout(&self, package: &str) -> Result<EnvLayout, SpecError> {
        Ok(EnvLayout::new(self.home.join(normalize_package(package)?)))
    }

    /// Install `spec` into a fresh environment and publish its scripts.
    ///
    /// Only specifier problems are returned as `Err`; everything else ends up
    /// in the outcome, with the environment rolled back on failure.
    #[tracing::instrument(skip(self))]
    pub fn install(
        &self,
        spec: &str,
        options: &InstallOptions,
    ) -> Result<InstallOutcome, SpecError> {
        let python = options.python.as_deref().unwrap_or(&self.python);
        let resolved = resolve(self.runtime, spec, python)?;
        let project = project_name(&resolved.name)?;
        let layout = self.package_layout(&resolved.name)?;

        if self.runtime.is_dir(layout.root()) {
            return Ok(InstallOutcome::AlreadyInstalled { name: resolved.name });
        }

        if !self.runtime.exists(&self.bin_dir)
            && let Err(e) = self.runtime.create_dir_all(&self.bin_dir)
        {
            return Ok(InstallOutcome::Failed(LifecycleError::Filesystem(format!(
                "Could not create {}: {}",
                self.bin_dir.display(),
                e
            ))));
        }

        if let Err(e) = self
            .runtime
            .create_dir_all(&self.home)
            .and_then(|_| self.runtime.create_dir(layout.root()))
        {
            if self.runtime.is_dir(layout.root()) {
                debug!("{:?} appeared while installing", layout.root());
                return Ok(InstallOutcome::AlreadyInstalled { name: resolved.name });
            }
            return Ok(InstallOutcome::Failed(LifecycleError::Filesystem(format!(
                "Could not create {}: {}",
                layout.root().display(),
                e
            ))));
        }

        let mut venv = Invocation::new(python).args(["-m", "venv"]);
        if options.system_site_packages {
            venv = venv.arg("--system-site-packages");
        }
        let venv = venv.arg(layout.root().to_string_lossy());
        if !self.succeeds(&venv) {
            self.rollback(&layout, &[]);
            return Ok(InstallOutcome::Failed(LifecycleError::CreateEnvironment));
        }

        let pip = self.pip_install(&layout, &resolved.install_args, false, options.editable);
        if !self.succeeds(&pip) {
            self.rollback(&layout, &[]);
            return Ok(InstallOutcome::Failed(LifecycleError::InstallPackage));
        }

        let scripts = find_scripts(self.runtime, &self.publisher, &layout, &project);
        let linked = self.link_scripts(&scripts);
        if linked.is_empty() {
            self.rollback(&layout, &linked);
            return Ok(InstallOutcome::Failed(LifecycleError::NoScripts));
        }

        if let Err(e) = self.save_package_info(&layout, &project, &linked) {
            self.rollback(&layout, &linked);
            return Ok(InstallOutcome::Failed(LifecycleError::Filesystem(format!(
                "{:#}",
                e
            ))));
        }

        info!("Installed {} into {:?}", project, layout.root());
        Ok(InstallOutcome::Installed {
            name: project,
            scripts: linked,
        })
    }

    /// Upgrade an installed package in place, republishing its scripts and
    /// removing the ones it no longer provides.
    #[tracing::instrument(skip(self))]
    pub fn upgrade(&self, spec: &str, editable: bool) -> Result<UpgradeOutcome, SpecError> {
        let resolved = resolve(self.runtime, spec, &self.python)?;
        let project = project_name(&resolved.name)?;
        let layout = self.package_layout(&resolved.name)?;

        if !self.runtime.is_dir(layout.root()) {
            return Ok(UpgradeOutcome::NotInstalled { name: resolved.name });
        }

        let old_scripts = self.package_scripts(layout.root());

        let pip = self.pip_install(&layout, &resolved.install_args, true, editable);
        if !self.succeeds(&pip) {
            return Ok(UpgradeOutcome::Failed(LifecycleError::UpgradePackage));
        }

        let scripts = find_scripts(self.runtime, &self.publisher, &layout, &project);
        let linked = self.link_scripts(&scripts);

        // Old records may spell the bin directory differently.
        let current: Vec<PathBuf> = linked
            .iter()
            .map(|script| real_location(self.runtime, script))
            .collect();
        for script in old_scripts
            .iter()
            .filter(|s| !current.contains(&real_location(self.runtime, s)))
        {
            if !self.publisher.owns(self.runtime, script, layout.root()) {
                debug!("Leaving {:?}, it no longer belongs to {}", script, project);
                continue;
            }
            println!("  Removing old script {}", script.display());
            self.remove_script(script);
        }

        if let Err(e) = self.save_package_info(&layout, &project, &linked) {
            return Ok(UpgradeOutcome::Failed(LifecycleError::Filesystem(format!(
                "{:#}",
                e
            ))));
        }

        Ok(UpgradeOutcome::Upgraded {
            name: project,
            scripts: linked,
        })
    }

    /// Plan the removal of an installed package. Nothing is touched until
    /// [`UninstallPlan::perform`].
    #[tracing::instrument(skip(self))]
    pub fn uninstall(&self, spec: &str) -> Result<UninstallPlan, SpecError> {
        let layout = self.package_layout(spec)?;
        if !self.runtime.is_dir(layout.root()) {
            return Ok(UninstallPlan::not_installed(spec));
        }

        let mut paths = vec![layout.root().to_path_buf()];
        paths.extend(
            self.package_scripts(layout.root())
                .into_iter()
                .filter(|script| self.publisher.owns(self.runtime, script, layout.root())),
        );
        Ok(UninstallPlan::new(spec, paths))
    }

    /// Every environment in `home`, sorted by name.
    ///
    /// Versions are only reported when `versions` is set. A damaged metadata
    /// record lists the package without scripts instead of failing.
    #[tracing::instrument(skip(self))]
    pub fn list_everything(&self, versions: bool) -> Vec<InstalledPackage> {
        if !self.runtime.is_dir(&self.home) {
            return Vec::new();
        }
        let entries = match self.runtime.read_dir(&self.home) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not read {:?}: {}", self.home, e);
                return Vec::new();
            }
        };

        let mut packages: Vec<InstalledPackage> = entries
            .into_iter()
            .filter(|entry| self.runtime.is_dir(entry))
            .filter_map(|entry| {
                let layout = EnvLayout::new(entry);
                if !self.runtime.is_file(&layout.python()) {
                    return None;
                }
                let name = layout.root().file_name()?.to_string_lossy().into_owned();
                let (scripts, version) = match PackageInfo::load(self.runtime, &layout.info_file()) {
                    Ok(info) => {
                        let scripts = info
                            .scripts
                            .unwrap_or_else(|| self.find_installed_executables(layout.root()));
                        (scripts, info.version)
                    }
                    Err(_) if !self.runtime.exists(&layout.info_file()) => {
                        (self.find_installed_executables(layout.root()), None)
                    }
                    Err(e) => {
                        warn!("{:#}", e);
                        (Vec::new(), None)
                    }
                };
                Some(InstalledPackage {
                    name,
                    scripts,
                    version: if versions { version } else { None },
                })
            })
            .collect();

        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages
    }

    /// Scripts published for the environment at `env_root`: the metadata
    /// record's list when it has one, otherwise a scan of the bin directory.
    pub fn package_scripts(&self, env_root: &Path) -> Vec<PathBuf> {
        let info_file = EnvLayout::new(env_root).info_file();
        match PackageInfo::load(self.runtime, &info_file) {
            Ok(PackageInfo {
                scripts: Some(scripts),
                ..
            }) => scripts,
            Ok(_) => self.find_installed_executables(env_root),
            Err(e) => {
                debug!("Scanning for scripts instead: {:#}", e);
                self.find_installed_executables(env_root)
            }
        }
    }

    /// Symlinks in the bin directory whose resolved target lies inside `env_root`.
    pub fn find_installed_executables(&self, env_root: &Path) -> Vec<PathBuf> {
        let prefix = real_path(self.runtime, env_root);
        let mut found: Vec<PathBuf> = self
            .runtime
            .read_dir(&self.bin_dir)
            .unwrap_or_default()
            .into_iter()
            .filter(|exe| {
                real_link_target(self.runtime, exe)
                    .is_some_and(|target| is_path_under(&target, &prefix))
            })
            .collect();
        found.sort();
        found
    }

    /// Publish each script under its basename in the bin directory. Returns
    /// the destinations that now provide a script.
    pub fn link_scripts(&self, scripts: &[PathBuf]) -> Vec<PathBuf> {
        let mut linked = Vec::new();
        for script in scripts {
            let Some(file_name) = script.file_name() else {
                continue;
            };
            let dest = self.bin_dir.join(file_name);
            if linked.contains(&dest) {
                continue;
            }
            if self.publisher.publish(self.runtime, script, &dest) {
                linked.push(dest);
            }
        }
        linked
    }

    pub fn save_package_info(
        &self,
        layout: &EnvLayout,
        project: &str,
        scripts: &[PathBuf],
    ) -> anyhow::Result<()> {
        let version = installed_version(self.runtime, layout, project);
        PackageInfo::new(project, version, scripts.to_vec()).save(self.runtime, &layout.info_file())
    }

    /// Best-effort removal of published scripts and the environment itself.
    fn rollback(&self, layout: &EnvLayout, published: &[PathBuf]) {
        for script in published {
            self.remove_script(script);
        }
        if let Err(e) = self.runtime.remove_dir_all(layout.root()) {
            debug!("Could not remove {:?}: {}", layout.root(), e);
        }
    }

    fn remove_script(&self, script: &Path) {
        let result = if self.runtime.is_symlink(script) {
            self.runtime.remove_symlink(script)
        } else {
            self.runtime.remove_file(script)
        };
        if let Err(e) = result {
            debug!("Could not remove {:?}: {}", script, e);
        }
    }

    fn pip_install(
        &self,
        layout: &EnvLayout,
        install_args: &[String],
        upgrade: bool,
        editable: bool,
    ) -> Invocation {
        let mut pip = Invocation::new(layout.pip()).arg("install");
        if upgrade {
            pip = pip.arg("--upgrade");
        }
        if editable {
            pip = pip.arg("--editable");
        }
        pip.args(install_args.iter().cloned())
    }

    fn succeeds(&self, invocation: &Invocation) -> bool {
        match self.runtime.run(invocation) {
            Ok(success) => success,
            Err(e) => {
                warn!("Could not run {}: {:#}", invocation, e);
                false
            }
        }
    }
}
