use anyhow::{Result, bail};

use crate::runtime::Runtime;

use super::config::Config;

/// Show what uninstalling `spec` removes, confirm, then remove it.
#[tracing::instrument(skip(runtime, config))]
pub fn uninstall<R: Runtime>(runtime: R, spec: &str, yes: bool, config: Config) -> Result<()> {
    let plan = config.repo(&runtime).uninstall(spec)?;
    if !plan.installed {
        println!("{} is not installed", spec);
        return Ok(());
    }

    println!("The following paths will be removed:");
    for path in &plan.paths {
        println!("  {}", path.display());
    }
    println!();

    if !yes && !runtime.confirm(&format!("Do you want to uninstall {}?", spec))? {
        bail!("Aborted!");
    }

    plan.perform(&runtime);
    println!("Done!");
    Ok(())
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{configure_mock_runtime_basics, test_bin_dir, test_venvs};
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            home: test_venvs(),
            bin_dir: test_bin_dir(),
            python: PathBuf::from("/usr/bin/python3"),
        }
    }

    /// An installed `grin` whose record lists `<bin>/grin`.
    fn installed_grin(runtime: &mut MockRuntime) {
        configure_mock_runtime_basics(runtime);
        runtime.expect_is_dir().returning(|_| true);
        runtime.expect_read_to_string().returning(|_| {
            Ok(r#"{"name": "grin", "version": "1.0", "scripts": ["/home/user/.local/bin/grin"]}"#.into())
        });
        runtime
            .expect_is_symlink()
            .with(eq(test_bin_dir().join("grin")))
            .returning(|_| true);
        runtime.expect_is_symlink().returning(|_| false);
        runtime
            .expect_resolve_link()
            .returning(|_| Ok(PathBuf::from("/home/user/.local/venvs/grin/bin/grin")));
    }

    #[test]
    fn test_uninstall_not_installed_succeeds() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_dir().returning(|_| false);
        runtime.expect_confirm().never();

        assert!(uninstall(runtime, "grin", false, config()).is_ok());
    }

    #[test]
    fn test_uninstall_confirmed() {
        let mut runtime = MockRuntime::new();
        installed_grin(&mut runtime);
        runtime
            .expect_confirm()
            .with(eq("Do you want to uninstall grin?"))
            .times(1)
            .returning(|_| Ok(true));
        runtime
            .expect_remove_symlink()
            .with(eq(test_bin_dir().join("grin")))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_remove_dir_all()
            .with(eq(test_venvs().join("grin")))
            .times(1)
            .returning(|_| Ok(()));

        assert!(uninstall(runtime, "grin", false, config()).is_ok());
    }

    #[test]
    fn test_uninstall_declined_removes_nothing() {
        let mut runtime = MockRuntime::new();
        installed_grin(&mut runtime);
        runtime.expect_confirm().returning(|_| Ok(false));
        runtime.expect_remove_symlink().never();
        runtime.expect_remove_dir_all().never();
        runtime.expect_remove_file().never();

        let err = uninstall(runtime, "grin", false, config()).unwrap_err();
        assert_eq!(err.to_string(), "Aborted!");
    }

    #[test]
    fn test_uninstall_yes_skips_prompt() {
        let mut runtime = MockRuntime::new();
        configure_mock_runtime_basics(&mut runtime);
        runtime.expect_is_dir().returning(|_| true);
        runtime.expect_read_to_string().returning(|_| {
            Ok(r#"{"name": "grin", "version": "1.0", "scripts": []}"#.into())
        });
        runtime.expect_is_symlink().returning(|_| false);
        runtime.expect_confirm().never();
        runtime
            .expect_remove_dir_all()
            .with(eq(test_venvs().join("grin")))
            .times(1)
            .returning(|_| Ok(()));

        assert!(uninstall(runtime, "grin", true, config()).is_ok());
    }
}
