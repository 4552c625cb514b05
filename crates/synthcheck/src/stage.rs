//! Stage model.
//!
//! A [`Stage`] is a labelled, ordered list of [`Step`]s. Stages run strictly
//! in sequence and the first failing step fails its stage; no partial credit.

use crate::artifact::Checkpoint;
use crate::assertion::Check;
use crate::diagnostics::DiagnosticWindow;
use crate::locator::Locator;
use crate::result::{FaultKind, HarnessError};
use crate::wait::{LoadState, SettlePoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One action or check inside a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Navigate to a URL
    Navigate {
        /// Target URL
        url: String,
    },
    /// Wait for a page load state
    WaitForLoad {
        /// State to reach
        state: LoadState,
    },
    /// Apply the settle policy configured for a point
    Settle {
        /// Which settle point
        point: SettlePoint,
    },
    /// Write a checkpoint screenshot
    Capture {
        /// Which checkpoint
        checkpoint: Checkpoint,
    },
    /// First match must be visible
    AssertVisible {
        /// Element description
        locator: Locator,
        /// Human label
        subject: String,
    },
    /// At least `min` matches must exist
    AssertCountAtLeast {
        /// Element description
        locator: Locator,
        /// Required minimum
        min: usize,
        /// Human label
        subject: String,
    },
    /// Click the first match
    Click {
        /// Element description
        locator: Locator,
        /// Human label
        subject: String,
    },
    /// Press and hold the first match, optionally capturing mid-hold
    HoldPointer {
        /// Element description
        locator: Locator,
        /// Human label
        subject: String,
        /// Hold duration in milliseconds
        duration_ms: u64,
        /// Screenshot taken before release
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capture: Option<Checkpoint>,
    },
    /// Set a range control's value
    SetRangeValue {
        /// Element description
        locator: Locator,
        /// Human label
        subject: String,
        /// New value
        value: String,
    },
    /// Run a console diagnostic window
    CollectDiagnostics {
        /// Window definition
        window: DiagnosticWindow,
    },
}

impl Step {
    /// Visibility check
    #[must_use]
    pub fn assert_visible(locator: Locator, subject: impl Into<String>) -> Self {
        Self::AssertVisible {
            locator,
            subject: subject.into(),
        }
    }

    /// Count check
    #[must_use]
    pub fn assert_count_at_least(locator: Locator, min: usize, subject: impl Into<String>) -> Self {
        Self::AssertCountAtLeast {
            locator,
            min,
            subject: subject.into(),
        }
    }

    /// Click action
    #[must_use]
    pub fn click(locator: Locator, subject: impl Into<String>) -> Self {
        Self::Click {
            locator,
            subject: subject.into(),
        }
    }

    /// Settle at a point
    #[must_use]
    pub const fn settle(point: SettlePoint) -> Self {
        Self::Settle { point }
    }

    /// Capture a checkpoint
    #[must_use]
    pub const fn capture(checkpoint: Checkpoint) -> Self {
        Self::Capture { checkpoint }
    }
}

/// A labelled group of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Progress label, e.g. "Checking header"
    pub label: String,
    /// Steps in order
    pub steps: Vec<Step>,
}

impl Stage {
    /// Create an empty stage
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }
}

/// Stage result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed,
    /// Skipped because an earlier stage failed
    NotRun,
}

impl StageStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::NotRun => write!(f, "not run"),
        }
    }
}

/// Why a run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    /// 1-based stage number; `None` for session teardown
    pub stage: Option<usize>,
    /// Stage label (or "Closing session")
    pub label: String,
    /// Fault classification
    pub kind: FaultKind,
    /// Top-level message
    pub message: String,
    /// Full cause chain, outermost first
    pub chain: Vec<String>,
}

impl StageFailure {
    /// Failure inside a numbered stage
    #[must_use]
    pub fn in_stage(stage: usize, label: &str, error: &HarnessError) -> Self {
        Self {
            stage: Some(stage),
            label: label.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            chain: error.chain(),
        }
    }

    /// Failure while closing the session
    #[must_use]
    pub fn teardown(error: &HarnessError) -> Self {
        Self {
            stage: None,
            label: "Closing session".to_string(),
            kind: error.kind(),
            message: error.to_string(),
            chain: error.chain(),
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(n) => write!(f, "stage {n} ({}): {}", self.label, self.message),
            None => write!(f, "{}: {}", self.label, self.message),
        }
    }
}

/// Outcome of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// 1-based position in the protocol
    pub index: usize,
    /// Stage label
    pub label: String,
    /// Result
    pub status: StageStatus,
    /// Checks that passed, in order
    pub checks: Vec<Check>,
    /// Wall time spent in the stage
    pub elapsed_ms: u64,
    /// Failure detail when `status` is `Failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl StageOutcome {
    /// Outcome for a stage skipped after an earlier failure
    #[must_use]
    pub fn not_run(index: usize, label: &str) -> Self {
        Self {
            index,
            label: label.to_string(),
            status: StageStatus::NotRun,
            checks: Vec::new(),
            elapsed_ms: 0,
            failure: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_builder() {
        let stage = Stage::new("Checking header")
            .with_step(Step::assert_visible(Locator::tag("h1"), "Header"))
            .with_steps([Step::settle(SettlePoint::AfterInteraction)]);
        assert_eq!(stage.steps.len(), 2);
        assert_eq!(stage.label, "Checking header");
    }

    #[test]
    fn test_failure_from_error() {
        let err = HarnessError::not_found("Resonance slider");
        let failure = StageFailure::in_stage(5, "Checking filter controls", &err);
        assert_eq!(failure.kind, FaultKind::NotFound);
        assert_eq!(
            failure.to_string(),
            "stage 5 (Checking filter controls): Resonance slider not found"
        );
        assert_eq!(failure.chain, vec!["Resonance slider not found".to_string()]);
    }

    #[test]
    fn test_teardown_failure_display() {
        let failure = StageFailure::teardown(&HarnessError::session("browser hung"));
        assert_eq!(failure.stage, None);
        assert!(failure.to_string().starts_with("Closing session"));
    }

    #[test]
    fn test_step_yaml_shape() {
        let yaml = "step: click\nlocator:\n  tag: button\n  text:\n    contains: Square\nsubject: Square button\n";
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(
            step,
            Step::click(Locator::tag("button").with_text("Square"), "Square button")
        );
    }

    #[test]
    fn test_not_run_outcome() {
        let outcome = StageOutcome::not_run(7, "Selecting Square waveform");
        assert_eq!(outcome.status, StageStatus::NotRun);
        assert!(!outcome.status.is_passed());
        assert_eq!(outcome.status.to_string(), "not run");
    }
}
