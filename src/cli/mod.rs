//! CLI module for the gateway reconciler.
//!
//! This module provides the command-line interface that reads a parameter
//! file and converges one API.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
