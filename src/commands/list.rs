use anyhow::Result;
use log::debug;

use crate::package::InstalledPackage;
use crate::runtime::Runtime;

use super::config::Config;

/// List every installed package and its published scripts.
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: R, versions: bool, config: Config) -> Result<()> {
    debug!("Listing packages from {:?}", config.home);

    let packages = config.repo(&runtime).list_everything(versions);
    if packages.iter().all(|package| package.scripts.is_empty()) {
        println!("There are no scripts installed through pipsi");
        return Ok(());
    }

    println!("Packages and scripts installed through pipsi:");
    for package in &packages {
        for line in describe(package, versions) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn describe(package: &InstalledPackage, versions: bool) -> Vec<String> {
    let header = if versions {
        format!(
            "  Package \"{}\" ({}):",
            package.name,
            package.version.as_deref().unwrap_or("unknown")
        )
    } else {
        format!("  Package \"{}\":", package.name)
    };
    std::iter::once(header)
        .chain(
            package
                .scripts
                .iter()
                .map(|script| format!("    {}", script.display())),
        )
        .collect()
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{test_bin_dir, test_venvs};
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            home: test_venvs(),
            bin_dir: test_bin_dir(),
            python: PathBuf::from("/usr/bin/python3"),
        }
    }

    fn grin() -> InstalledPackage {
        InstalledPackage {
            name: "grin".into(),
            scripts: vec![test_bin_dir().join("grin"), test_bin_dir().join("grind")],
            version: None,
        }
    }

    #[test]
    fn test_describe_without_versions() {
        assert_eq!(
            describe(&grin(), false),
            vec![
                "  Package \"grin\":",
                "    /home/user/.local/bin/grin",
                "    /home/user/.local/bin/grind",
            ]
        );
    }

    #[test]
    fn test_describe_with_versions() {
        let mut package = grin();
        assert_eq!(describe(&package, true)[0], "  Package \"grin\" (unknown):");

        package.version = Some("1.2.1".into());
        assert_eq!(describe(&package, true)[0], "  Package \"grin\" (1.2.1):");
    }

    #[test]
    fn test_list_missing_home() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_dir()
            .with(eq(test_venvs()))
            .returning(|_| false);
        runtime.expect_read_dir().never();

        assert!(list(runtime, false, config()).is_ok());
    }

    #[test]
    fn test_list_with_packages() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_dir().returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(test_venvs()))
            .returning(|_| Ok(vec![test_venvs().join("grin")]));
        runtime.expect_is_file().returning(|_| true);
        runtime.expect_read_to_string().returning(|_| {
            Ok(r#"{"name": "grin", "version": "1.2.1", "scripts": ["/home/user/.local/bin/grin"]}"#.into())
        });

        assert!(list(runtime, true, config()).is_ok());
    }
}
