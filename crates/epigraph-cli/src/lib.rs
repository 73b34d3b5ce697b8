//! Epigraph CLI library.
//!
//! This library provides the core functionality for the `epigraph` command-line
//! interface: argument parsing, configuration loading, command execution
//! against a SQLite evidence store, and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
