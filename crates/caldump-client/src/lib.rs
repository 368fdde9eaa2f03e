//! CLI, configuration, credential prompts and commands.
//!
//! This crate provides the `caldump` command-line interface.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompt;
pub mod secret;
pub mod session;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
