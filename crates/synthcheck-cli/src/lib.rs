//! Synthcheck CLI library
//!
//! Argument parsing, configuration layering and the terminal report stream
//! for the `synthcheck` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]

mod commands;
mod config;
mod error;
mod output;

pub use commands::{Cli, ColorArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{finish, ProgressReporter};
