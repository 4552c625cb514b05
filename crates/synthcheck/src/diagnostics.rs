//! Console diagnostics.
//!
//! Console output is collected only inside an explicit window: subscribe, run
//! the window body (by default reload, wait for network idle, settle), then
//! unsubscribe and classify. Findings are advisory. They are reported and
//! counted but never change the verdict.
//!
//! Reloading before the window means console output produced during the
//! interactive stages is not covered. This narrowing is intentional: the
//! window observes a clean page load.

use crate::driver::Driver;
use crate::result::HarnessResult;
use crate::wait::{wait_for_load_state, LoadState, WaitOptions, WaitPolicy};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Number of error messages shown in the report preview
pub const ERROR_PREVIEW_LIMIT: usize = 5;

/// Console message severity as reported by the browser
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleSeverity {
    /// console.log
    Log,
    /// console.debug
    Debug,
    /// console.info
    Info,
    /// console.warn
    Warning,
    /// console.error
    Error,
    /// Anything else the engine reports (trace, dir, table, ...)
    Other(String),
}

impl fmt::Display for ConsoleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

impl ConsoleSeverity {
    /// Parse severity from the engine's type name
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" | "assert" => Self::Error,
            "warn" | "warning" => Self::Warning,
            "info" => Self::Info,
            "debug" | "verbose" => Self::Debug,
            "log" => Self::Log,
            other => Self::Other(other.to_string()),
        }
    }

    /// Report bucket for this severity
    #[must_use]
    pub const fn class(&self) -> ConsoleClass {
        match self {
            Self::Error => ConsoleClass::Error,
            Self::Warning => ConsoleClass::Warning,
            _ => ConsoleClass::Other,
        }
    }
}

/// Report bucket: errors, warnings, everything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleClass {
    /// Errors (advisory)
    Error,
    /// Warnings (informational)
    Warning,
    /// Everything else
    Other,
}

/// Captured console message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Severity level
    pub severity: ConsoleSeverity,
    /// Message text
    pub text: String,
}

impl ConsoleMessage {
    /// Create a new console message
    #[must_use]
    pub fn new(severity: ConsoleSeverity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }

    /// Shorthand for an error message
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(ConsoleSeverity::Error, text)
    }

    /// Shorthand for a warning message
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(ConsoleSeverity::Warning, text)
    }

    /// Shorthand for a log message
    #[must_use]
    pub fn log(text: impl Into<String>) -> Self {
        Self::new(ConsoleSeverity::Log, text)
    }
}

impl fmt::Display for ConsoleMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.text)
    }
}

/// Classified console messages from one collection window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// All messages in arrival order
    pub messages: Vec<ConsoleMessage>,
}

impl DiagnosticReport {
    /// Build a report from messages in arrival order
    #[must_use]
    pub fn new(messages: Vec<ConsoleMessage>) -> Self {
        Self { messages }
    }

    fn of_class(&self, class: ConsoleClass) -> Vec<&ConsoleMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity.class() == class)
            .collect()
    }

    /// Error messages in arrival order
    #[must_use]
    pub fn errors(&self) -> Vec<&ConsoleMessage> {
        self.of_class(ConsoleClass::Error)
    }

    /// Warning messages in arrival order
    #[must_use]
    pub fn warnings(&self) -> Vec<&ConsoleMessage> {
        self.of_class(ConsoleClass::Warning)
    }

    /// Messages that are neither errors nor warnings
    #[must_use]
    pub fn other(&self) -> Vec<&ConsoleMessage> {
        self.of_class(ConsoleClass::Other)
    }

    /// Number of errors
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors().len()
    }

    /// Number of warnings
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings().len()
    }

    /// First `limit` error texts
    #[must_use]
    pub fn error_preview(&self, limit: usize) -> Vec<&str> {
        self.errors()
            .into_iter()
            .take(limit)
            .map(|m| m.text.as_str())
            .collect()
    }
}

/// Subscribe, run `window`, unsubscribe, return what arrived.
///
/// The subscription is released even when `window` fails; the window's error
/// takes precedence over an unsubscribe error.
pub async fn collect_with<D, F>(driver: &mut D, window: F) -> HarnessResult<Vec<ConsoleMessage>>
where
    D: Driver + ?Sized,
    F: for<'a> FnOnce(&'a mut D) -> BoxFuture<'a, HarnessResult<()>>,
{
    driver.start_console_capture().await?;
    let outcome = window(driver).await;
    let messages = driver.stop_console_capture().await;
    outcome?;
    let messages = messages?;
    debug!(count = messages.len(), "console window closed");
    Ok(messages)
}

/// The standard diagnostic window body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticWindow {
    /// Reload before observing
    pub reload: bool,
    /// Load state to wait for after the reload
    pub wait_until: LoadState,
    /// Settle after the load state is reached
    pub settle: WaitPolicy,
}

impl Default for DiagnosticWindow {
    fn default() -> Self {
        Self {
            reload: true,
            wait_until: LoadState::NetworkIdle,
            settle: WaitPolicy::fixed_ms(1000),
        }
    }
}

impl DiagnosticWindow {
    /// Execute the window body against the driver
    pub async fn run<D: Driver + ?Sized>(
        &self,
        driver: &mut D,
        options: &WaitOptions,
    ) -> HarnessResult<()> {
        if self.reload {
            driver.reload().await?;
        }
        wait_for_load_state(&*driver, self.wait_until, options).await?;
        self.settle.settle(&*driver).await
    }
}

/// Collect console output over `window` and classify it
pub async fn collect<D: Driver + ?Sized>(
    driver: &mut D,
    window: DiagnosticWindow,
    options: &WaitOptions,
) -> HarnessResult<DiagnosticReport> {
    let options = options.clone();
    let messages = collect_with(driver, move |d| {
        Box::pin(async move { window.run(d, &options).await })
    })
    .await?;
    Ok(DiagnosticReport::new(messages))
}
