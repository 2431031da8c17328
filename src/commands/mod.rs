//! One function per CLI command. Each takes the runtime by value, the
//! command's arguments and the resolved [`Config`].

pub mod config;
mod install;
mod list;
mod uninstall;
mod upgrade;

pub use config::Config;
pub use install::install;
pub use list::list;
pub use uninstall::uninstall;
pub use upgrade::upgrade;
