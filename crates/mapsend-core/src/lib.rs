pub mod config;
pub mod logging;

pub mod client_config;
pub mod control;
pub mod deploy;
pub mod discover;
pub mod gate;
pub mod publish;
pub mod retry;
pub mod revision;
pub mod scheduler;
pub mod transport;
pub mod upload;
