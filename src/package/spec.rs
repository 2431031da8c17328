//! Package specifier parsing, normalization and resolution.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

use crate::runtime::{Invocation, Runtime};

/// A package specifier that cannot be used to install anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    #[error("{0}")]
    InvalidSpecification(String),
}

fn invalid(message: impl Into<String>) -> SpecError {
    SpecError::InvalidSpecification(message.into())
}

/// A requirement such as `Foo[cli]>=1.2; python_version>"3"`.
///
/// Extras, the version constraint and markers are validated but only the
/// project name is kept; it is all an environment is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Project name with runs of characters other than ASCII alphanumerics and `.` folded to `-`.
    pub name: String,
}

impl Requirement {
    /// The environment directory key: lowercase project name.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

impl FromStr for Requirement {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let not_a_requirement = || invalid(format!("{:?} is not a valid package specifier", s));

        let name_end = s
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
            .unwrap_or(s.len());
        let raw_name = &s[..name_end];
        let starts_ok = raw_name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        let ends_ok = raw_name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
        if !starts_ok || !ends_ok {
            return Err(not_a_requirement());
        }

        let mut rest = s[name_end..].trim_start();

        if let Some(inner) = rest.strip_prefix('[') {
            let close = inner.find(']').ok_or_else(not_a_requirement)?;
            rest = inner[close + 1..].trim_start();
        }

        // Environment markers do not affect the name.
        if let Some(marker) = rest.find(';') {
            rest = rest[..marker].trim_end();
        }

        if !rest.is_empty() && !rest.starts_with(['=', '<', '>', '!', '~', '(', '@']) {
            return Err(not_a_requirement());
        }

        Ok(Requirement {
            name: safe_name(raw_name),
        })
    }
}

/// Fold every run of characters other than ASCII alphanumerics and `.` into a single `-`.
fn safe_name(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            safe.push(c);
            in_run = false;
        } else if !in_run {
            safe.push('-');
            in_run = true;
        }
    }
    safe
}

/// The project name of a specifier, version and extras stripped, case kept.
pub fn project_name(spec: &str) -> Result<String, SpecError> {
    Ok(spec.parse::<Requirement>()?.name)
}

/// The canonical, lowercase project name of a specifier.
///
/// `Foo==1.2`, `foo` and `FOO[extra]` all normalize to `foo`.
pub fn normalize_package(spec: &str) -> Result<String, SpecError> {
    Ok(spec.parse::<Requirement>()?.key())
}

/// A specifier resolved to the name its environment is keyed by and the
/// arguments handed to the package installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpec {
    pub name: String,
    pub install_args: Vec<String>,
}

impl ResolvedSpec {
    fn passthrough(name: impl Into<String>, spec: &str) -> Self {
        Self {
            name: name.into(),
            install_args: vec![spec.to_string()],
        }
    }
}

/// Work out which project `spec` installs.
///
/// - URLs with a host (`git+https://host/repo#egg=Foo`) must name the project
///   in an `#egg=` fragment.
/// - Local directories (or `file://` URLs) are asked for their declared name,
///   through `setup.py --name` run by `python`, or from `pyproject.toml`.
/// - Anything else is a plain requirement and is returned unchanged.
#[tracing::instrument(skip(runtime))]
pub fn resolve<R: Runtime>(
    runtime: &R,
    spec: &str,
    python: &Path,
) -> Result<ResolvedSpec, SpecError> {
    let location = match Url::parse(spec) {
        Ok(url) if url.scheme() == "file" => Some(
            url.to_file_path()
                .map_err(|_| invalid(format!("{} is not a usable file URL", spec)))?,
        ),
        Ok(url) if url.host().is_some() => {
            let name = egg_name(&url).ok_or_else(|| {
                invalid(
                    "When installing from URLs you need to add an egg at the end. \
                     For instance git+https://.../#egg=Foo",
                )
            })?;
            return Ok(ResolvedSpec::passthrough(name, spec));
        }
        _ if runtime.is_dir(Path::new(spec)) => Some(PathBuf::from(spec)),
        _ => None,
    };

    let Some(location) = location else {
        return Ok(ResolvedSpec::passthrough(spec, spec));
    };

    let name = local_project_name(runtime, spec, &location, python)?;
    Ok(ResolvedSpec {
        name,
        install_args: vec![location.to_string_lossy().into_owned()],
    })
}

/// `egg=Foo&subdirectory=cli` -> `Foo`
fn egg_name(url: &Url) -> Option<String> {
    let egg = url.fragment()?.strip_prefix("egg=")?;
    let name = egg.split('&').next().unwrap_or_default().trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[derive(Deserialize)]
struct PyProject {
    project: Option<ProjectTable>,
}

#[derive(Deserialize)]
struct ProjectTable {
    name: Option<String>,
}

fn local_project_name<R: Runtime>(
    runtime: &R,
    spec: &str,
    location: &Path,
    python: &Path,
) -> Result<String, SpecError> {
    if runtime.exists(&location.join("setup.py")) {
        let invocation = Invocation::new(python)
            .args(["setup.py", "--name"])
            .current_dir(location);
        let output = runtime.output(&invocation).map_err(|e| {
            invalid(format!(
                "{} does not appear to be a valid package. Error from setup.py: {}",
                spec, e
            ))
        })?;
        if !output.success {
            return Err(invalid(format!(
                "{} does not appear to be a valid package. Error from setup.py: {}",
                spec, output.stderr
            )));
        }
        // setup.py may chatter before printing the name.
        return output
            .stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(String::from)
            .ok_or_else(|| invalid(format!("setup.py in {} did not report a name", spec)));
    }

    let pyproject_path = location.join("pyproject.toml");
    if runtime.exists(&pyproject_path) {
        let content = runtime
            .read_to_string(&pyproject_path)
            .map_err(|e| invalid(format!("Could not read {:?}: {}", pyproject_path, e)))?;
        let pyproject: PyProject = toml::from_str(&content)
            .map_err(|e| invalid(format!("Could not parse {:?}: {}", pyproject_path, e)))?;
        return pyproject
            .project
            .and_then(|project| project.name)
            .ok_or_else(|| {
                invalid(format!(
                    "{} does not declare a [project] name in pyproject.toml",
                    spec
                ))
            });
    }

    Err(invalid(format!(
        "{} does not appear to be a local Python package.",
        spec
    )))
}
