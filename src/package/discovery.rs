//! Script discovery: asking an environment's own interpreter which files the
//! installed distribution owns, and keeping the exposable executables.

use log::{debug, warn};
use std::path::PathBuf;

use crate::platform::{EnvLayout, Publisher};
use crate::runtime::{Invocation, Runtime, is_path_under, real_path};

/// Prints the installed file manifest of a distribution, one absolute path per line.
pub const FIND_SCRIPTS: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/find_scripts.py"));

/// Prints the installed version of a distribution.
pub const GET_VERSION: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/get_version.py"));

/// Executables of `package` inside the environment's bin directory that the
/// publisher can expose, in manifest order without duplicates.
///
/// A failing introspection run yields no scripts.
#[tracing::instrument(skip(runtime, publisher))]
pub fn find_scripts<R: Runtime, P: Publisher>(
    runtime: &R,
    publisher: &P,
    layout: &EnvLayout,
    package: &str,
) -> Vec<PathBuf> {
    let bin_dir = layout.bin_dir();
    let invocation = Invocation::new(layout.python()).args([
        "-c".to_string(),
        FIND_SCRIPTS.to_string(),
        package.to_string(),
        bin_dir.to_string_lossy().into_owned(),
    ]);

    let output = match runtime.output(&invocation) {
        Ok(output) if output.success => output,
        Ok(output) => {
            warn!(
                "Could not list the files of {} in {:?}: {}",
                package,
                layout.root(),
                output.stderr
            );
            return Vec::new();
        }
        Err(e) => {
            warn!("Could not run {:?}: {}", layout.python(), e);
            return Vec::new();
        }
    };

    let prefix = real_path(runtime, &bin_dir);
    let mut scripts: Vec<PathBuf> = Vec::new();
    for line in output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let path = real_path(runtime, &PathBuf::from(line));
        if !is_path_under(&path, &prefix) {
            continue;
        }
        for candidate in publisher.variants(runtime, &path) {
            if !scripts.contains(&candidate) && publisher.is_publishable(runtime, &candidate) {
                debug!("Found script {:?}", candidate);
                scripts.push(candidate);
            }
        }
    }
    scripts
}

/// The installed version of `package`, or `None` when it cannot be determined.
#[tracing::instrument(skip(runtime))]
pub fn installed_version<R: Runtime>(
    runtime: &R,
    layout: &EnvLayout,
    package: &str,
) -> Option<String> {
    let invocation = Invocation::new(layout.python()).args(["-c", GET_VERSION, package]);
    match runtime.output(&invocation) {
        Ok(output) if output.success && !output.stdout.is_empty() => Some(output.stdout),
        Ok(output) => {
            debug!("No version for {}: {}", package, output.stderr);
            None
        }
        Err(e) => {
            debug!("No version for {}: {}", package, e);
            None
        }
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::platform::SymlinkPublisher;
    use crate::runtime::{CapturedOutput, MockRuntime};
    use mockall::predicate::eq;
    use std::path::Path;

    fn layout() -> EnvLayout {
        EnvLayout::new("/venvs/samplecli")
    }

    fn manifest(stdout: &str) -> CapturedOutput {
        CapturedOutput {
            success: true,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_embedded_snippets_are_present() {
        assert!(FIND_SCRIPTS.contains("sys.argv[2]"));
        assert!(GET_VERSION.contains("version"));
    }

    #[test]
    fn test_find_scripts_filters_to_executables_in_bin() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_output()
            .withf(|inv| {
                inv.program == Path::new("/venvs/samplecli/bin/python")
                    && inv.args[0] == "-c"
                    && inv.args[2] == "samplecli"
                    && inv.args[3] == "/venvs/samplecli/bin"
            })
            .returning(|_| {
                Ok(manifest(
                    "/venvs/samplecli/lib/python3.12/site-packages/samplecli/__init__.py\n\
                     /venvs/samplecli/bin/samplecli\n\
                     /venvs/samplecli/bin/samplecli-admin\n\
                     /venvs/samplecli/bin/samplecli.cfg\n\
                     /venvs/samplecli/bin/../bin/samplecli\n\
                     /venvs/samplecli-extra/bin/other\n",
                ))
            });
        runtime
            .expect_canonicalize()
            .returning(|p| Ok(crate::runtime::normalize_path(p)));
        runtime
            .expect_is_executable()
            .with(eq(PathBuf::from("/venvs/samplecli/bin/samplecli.cfg")))
            .returning(|_| false);
        runtime.expect_is_executable().returning(|_| true);

        let scripts = find_scripts(&runtime, &SymlinkPublisher, &layout(), "samplecli");
        assert_eq!(
            scripts,
            vec![
                PathBuf::from("/venvs/samplecli/bin/samplecli"),
                PathBuf::from("/venvs/samplecli/bin/samplecli-admin"),
            ]
        );
    }

    #[test]
    fn test_find_scripts_failed_introspection_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime.expect_output().returning(|_| {
            Ok(CapturedOutput {
                success: false,
                stdout: String::new(),
                stderr: "PackageNotFoundError: samplecli".into(),
            })
        });

        assert!(find_scripts(&runtime, &SymlinkPublisher, &layout(), "samplecli").is_empty());
    }

    #[test]
    fn test_find_scripts_spawn_failure_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_output()
            .returning(|_| Err(anyhow::anyhow!("No such file or directory")));

        assert!(find_scripts(&runtime, &SymlinkPublisher, &layout(), "samplecli").is_empty());
    }

    #[test]
    fn test_installed_version() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_output()
            .withf(|inv| inv.args.len() == 3 && inv.args[2] == "samplecli")
            .returning(|_| Ok(manifest("1.4.0")));

        assert_eq!(
            installed_version(&runtime, &layout(), "samplecli").as_deref(),
            Some("1.4.0")
        );
    }

    #[test]
    fn test_installed_version_unknown() {
        let mut runtime = MockRuntime::new();
        runtime.expect_output().returning(|_| {
            Ok(CapturedOutput {
                success: false,
                stdout: String::new(),
                stderr: "Traceback".into(),
            })
        });

        assert_eq!(installed_version(&runtime, &layout(), "samplecli"), None);
    }
}
