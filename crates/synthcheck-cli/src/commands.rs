//! CLI command definitions using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Synthcheck: run the Synthualizer acceptance protocol in a real browser
#[derive(Parser, Debug)]
#[command(name = "synthcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application URL (default http://localhost:3001)
    #[arg(long, env = "SYNTHCHECK_URL")]
    pub url: Option<String>,

    /// Directory for screenshots and the run manifest (default /tmp)
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// YAML protocol configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Disable the Chromium sandbox (needed in some containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium executable to launch
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Write a JUnit XML report to this path
    #[arg(long)]
    pub junit: Option<PathBuf>,

    /// Print the effective protocol configuration as YAML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only failures are printed)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatically detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
