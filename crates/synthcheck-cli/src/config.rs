//! CLI configuration
//!
//! Layering: built-in defaults, then the YAML file given with `--config`,
//! then command-line flags.

use crate::commands::Cli;
use crate::error::CliResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use synthcheck::{DriverConfig, ProtocolConfig};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default `tracing` filter when `RUST_LOG` is unset
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// Everything one invocation needs
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Protocol constants
    pub protocol: ProtocolConfig,
    /// Browser launch settings
    pub driver: DriverConfig,
    /// JUnit report destination
    pub junit: Option<PathBuf>,
    /// Print the protocol configuration and exit
    pub print_config: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
            protocol: ProtocolConfig::default(),
            driver: DriverConfig::default(),
            junit: None,
            print_config: false,
        }
    }
}

impl CliConfig {
    /// Resolve parsed arguments into a validated configuration
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let mut protocol = match &cli.config {
            Some(path) => ProtocolConfig::from_yaml_file(path)?,
            None => ProtocolConfig::default(),
        };
        if let Some(url) = &cli.url {
            protocol.url.clone_from(url);
        }
        if let Some(dir) = &cli.artifact_dir {
            protocol.artifact_dir.clone_from(dir);
        }
        protocol.validate()?;

        let mut driver = DriverConfig::new()
            .headless(!cli.headful)
            .sandbox(!cli.no_sandbox);
        if let Some(path) = &cli.chromium_path {
            driver = driver.executable(path);
        }

        Ok(Self {
            verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
            color: cli.color.into(),
            protocol,
            driver,
            junit: cli.junit.clone(),
            print_config: cli.print_config,
        })
    }
}
