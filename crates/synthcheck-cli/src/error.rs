//! Error types for the CLI

use synthcheck::{HarnessError, StageFailure};
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The protocol ran and a stage failed
    #[error("{failure}")]
    StageFailed {
        /// First failure of the run
        failure: StageFailure,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error(transparent)]
    Harness(#[from] HarnessError),

    /// Could not render output
    #[error("Output error: {message}")]
    Output {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an output error
    #[must_use]
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Numbered-trace lines, outermost first
    #[must_use]
    pub fn chain(&self) -> Vec<String> {
        match self {
            Self::StageFailed { failure } => failure.chain.clone(),
            Self::Harness(err) => err.chain(),
            other => {
                let mut chain = vec![other.to_string()];
                let mut source = std::error::Error::source(other);
                while let Some(cause) = source {
                    chain.push(cause.to_string());
                    source = cause.source();
                }
                chain
            }
        }
    }
}
