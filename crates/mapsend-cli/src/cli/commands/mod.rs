//! CLI command handlers, one file per subcommand.

mod client_config;
mod deploy;
mod discover;
mod upload;

pub use client_config::run_client_config;
pub use deploy::run_deploy;
pub use discover::run_discover;
pub use upload::run_upload;
