//! Platform-specific pieces: where things live inside an isolated environment
//! and how an environment's executables are exposed in the bin directory.

mod layout;
mod publish;

pub use layout::EnvLayout;
pub use publish::{CopyPublisher, DefaultPublisher, Publisher, SymlinkPublisher};
