//! Result and error types for synthcheck.
//!
//! Every fault raised while driving the application is unrecoverable at the
//! point it happens. Faults propagate to the orchestrator, which is the only
//! place that catches them. Console output collected from the page is never
//! represented here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for synthcheck operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while running the harness
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A required element is absent or not visible
    #[error("{subject} not found")]
    NotFound {
        /// Human label of what was expected (e.g. "Resonance slider")
        subject: String,
    },

    /// An input simulation step could not be delivered
    #[error("Interaction with {subject} failed: {message}")]
    InteractionFault {
        /// Human label of the interaction target
        subject: String,
        /// Error message
        message: String,
    },

    /// Screenshot capture or persist failed
    #[error("Failed to write artifact {}: {message}", path.display())]
    ArtifactWriteFault {
        /// Destination path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Browser/session could not be started, navigated, or closed
    #[error("Session fault: {message}")]
    SessionFault {
        /// Error message
        message: String,
    },

    /// A poll-until wait ran past its deadline
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create a not-found error
    #[must_use]
    pub fn not_found(subject: impl Into<String>) -> Self {
        Self::NotFound {
            subject: subject.into(),
        }
    }

    /// Create an interaction fault
    #[must_use]
    pub fn interaction(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InteractionFault {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Create an artifact write fault
    #[must_use]
    pub fn artifact(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ArtifactWriteFault {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a session fault
    #[must_use]
    pub fn session(message: impl Into<String>) -> Self {
        Self::SessionFault {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Classify the error into the reporting taxonomy
    #[must_use]
    pub const fn kind(&self) -> FaultKind {
        match self {
            Self::NotFound { .. } => FaultKind::NotFound,
            Self::InteractionFault { .. } => FaultKind::InteractionFault,
            Self::ArtifactWriteFault { .. } => FaultKind::ArtifactWriteFault,
            Self::SessionFault { .. } | Self::Timeout { .. } => FaultKind::SessionFault,
            Self::Config { .. } | Self::Yaml(_) => FaultKind::Config,
            Self::Io(_) | Self::Json(_) => FaultKind::SessionFault,
        }
    }

    /// Human-readable cause chain, outermost first
    #[must_use]
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        chain
    }
}

/// Fault taxonomy used in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    /// Required element absent or hidden
    NotFound,
    /// Input could not be delivered
    InteractionFault,
    /// Screenshot could not be captured or written
    ArtifactWriteFault,
    /// Browser session failure
    SessionFault,
    /// Bad configuration
    Config,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::InteractionFault => "InteractionFault",
            Self::ArtifactWriteFault => "ArtifactWriteFault",
            Self::SessionFault => "SessionFault",
            Self::Config => "Config",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_subject() {
        let err = HarnessError::not_found("Resonance slider");
        assert_eq!(err.to_string(), "Resonance slider not found");
        assert_eq!(err.kind(), FaultKind::NotFound);
    }

    #[test]
    fn test_interaction_fault_message() {
        let err = HarnessError::interaction("A key", "no bounding box");
        assert!(err.to_string().contains("A key"));
        assert!(err.to_string().contains("no bounding box"));
        assert_eq!(err.kind(), FaultKind::InteractionFault);
    }

    #[test]
    fn test_artifact_fault_includes_path() {
        let err = HarnessError::artifact("/nope/shot.png", "permission denied");
        assert!(err.to_string().contains("/nope/shot.png"));
        assert_eq!(err.kind(), FaultKind::ArtifactWriteFault);
    }

    #[test]
    fn test_timeout_is_session_fault() {
        let err = HarnessError::Timeout {
            what: "networkidle".to_string(),
            ms: 100,
        };
        assert_eq!(err.kind(), FaultKind::SessionFault);
        assert!(err.to_string().contains("100ms"));
    }

    #[test]
    fn test_chain_includes_sources() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: HarnessError = io_err.into();
        let chain = err.chain();
        assert_eq!(chain.len(), 2);
        assert!(chain[0].starts_with("I/O error"));
        assert_eq!(chain[1], "denied");
    }

    #[test]
    fn test_fault_kind_display() {
        assert_eq!(FaultKind::NotFound.to_string(), "NotFound");
        assert_eq!(FaultKind::SessionFault.to_string(), "SessionFault");
    }
}
