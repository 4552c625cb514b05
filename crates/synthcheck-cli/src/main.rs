//! Synthcheck CLI: run the Synthualizer acceptance protocol
//!
//! ## Usage
//!
//! ```bash
//! synthcheck                                  # http://localhost:3001, artifacts in /tmp
//! synthcheck --url http://127.0.0.1:8080      # another instance
//! synthcheck --config synth.yaml --junit junit.xml
//! synthcheck --print-config > synth.yaml      # dump the effective configuration
//! ```

use clap::Parser;
use std::process::ExitCode;
use synthcheck::Verdict;
use synthcheck_cli::{finish, Cli, CliConfig, CliError, CliResult, ProgressReporter};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match CliConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    if config.print_config {
        return match config.protocol.to_yaml() {
            Ok(yaml) => {
                print!("{yaml}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_failure(error: &CliError) {
    eprintln!("Test failed: {error}");
    let chain = error.chain();
    if chain.len() > 1 || matches!(error, CliError::StageFailed { .. }) {
        for (i, cause) in chain.iter().enumerate() {
            eprintln!("  {}: {cause}", i + 1);
        }
    }
}

fn run(config: &CliConfig) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let mut reporter = ProgressReporter::new(
        config.color.should_color(),
        config.verbosity.is_quiet(),
    );
    console::set_colors_enabled(reporter.use_color);

    let verdict = runtime.block_on(run_protocol(config, &mut reporter))?;

    finish(verdict, config.junit.as_deref(), &config.protocol.app_name)
}

#[cfg(feature = "browser")]
async fn run_protocol(config: &CliConfig, reporter: &mut ProgressReporter) -> CliResult<Verdict> {
    let driver = synthcheck::ChromiumDriver::launch(config.driver.clone()).await?;
    let orchestrator = synthcheck::Orchestrator::new(config.protocol.clone());
    Ok(orchestrator
        .run(synthcheck::Session::new(driver), reporter)
        .await)
}

#[cfg(not(feature = "browser"))]
async fn run_protocol(
    _config: &CliConfig,
    _reporter: &mut ProgressReporter,
) -> CliResult<Verdict> {
    Err(CliError::config(
        "browser support not enabled. Rebuild with --features browser",
    ))
}
