//! Command-line client for timehunt.
//!
//! This crate provides the `timehunt` binary: argument parsing, the
//! configuration file, and the `list`, `fix`, `auth` and `config` commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod secret;

#[cfg(test)]
mod testing;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
