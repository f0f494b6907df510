pub mod cli;
pub mod commands;
pub mod init;
pub mod load_config;
pub mod prompt;

pub use cli::{run, Cli, Commands};
