use anyhow::Result;
use clap::Parser;
use pipsi::commands::{self, Config};
use std::path::PathBuf;

/// pipsi - installs Python command line tools into isolated environments
///
/// Every package gets its own virtual environment under the home directory;
/// its scripts are linked into the bin directory, which should be on PATH.
///
/// Examples:
///   pipsi install grin        # Install grin and link its scripts
///   pipsi upgrade grin        # Upgrade it in place
///   pipsi list --versions     # Show what is installed
#[derive(Parser, Debug)]
#[command(author, version = env!("PIPSI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The folder that contains the virtualenvs (default: ~/.local/venvs)
    #[arg(long, env = "PIPSI_HOME", value_name = "DIR", global = true)]
    home: Option<PathBuf>,

    /// The path where the scripts are symlinked to (default: ~/.local/bin)
    #[arg(long, env = "PIPSI_BIN_DIR", value_name = "DIR", global = true)]
    bin_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install the scripts of a Python package into a new virtualenv
    Install(InstallArgs),

    /// Upgrade an already installed package
    Upgrade(UpgradeArgs),

    /// Uninstall the scripts of a package and remove its virtualenv
    Uninstall(UninstallArgs),

    /// List all scripts installed through pipsi
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Package name, requirement, VCS URL with #egg=Name, or local project path
    #[arg(value_name = "PACKAGE")]
    package: String,

    /// The python interpreter to use
    #[arg(long, value_name = "PYTHON")]
    python: Option<PathBuf>,

    /// Enable editable installation. This only works for locally installed packages
    #[arg(long, short = 'e')]
    editable: bool,

    /// Give the virtual environment access to the global site-packages
    #[arg(long)]
    system_site_packages: bool,
}

#[derive(clap::Args, Debug)]
struct UpgradeArgs {
    #[arg(value_name = "PACKAGE")]
    package: String,

    /// Enable editable installation. This only works for locally installed packages
    #[arg(long, short = 'e')]
    editable: bool,
}

#[derive(clap::Args, Debug)]
struct UninstallArgs {
    #[arg(value_name = "PACKAGE")]
    package: String,

    /// Skip all prompts
    #[arg(long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    /// Show package versions
    #[arg(long)]
    versions: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = pipsi::runtime::RealRuntime;
    let config = Config::new(&runtime, cli.home, cli.bin_dir)?;

    match cli.command {
        Commands::Install(args) => commands::install(
            runtime,
            &args.package,
            args.python,
            args.editable,
            args.system_site_packages,
            config,
        )?,
        Commands::Upgrade(args) => {
            commands::upgrade(runtime, &args.package, args.editable, config)?
        }
        Commands::Uninstall(args) => {
            commands::uninstall(runtime, &args.package, args.yes, config)?
        }
        Commands::List(args) => commands::list(runtime, args.versions, config)?,
    }
    Ok(())
}
