//! Report stream.
//!
//! The orchestrator emits [`ReportEvent`]s in protocol order; a [`Reporter`]
//! renders them. The plain `Display` form carries no timings, so two runs
//! against an unchanged application produce identical text.

use crate::artifact::Artifact;
use crate::assertion::Check;
use crate::diagnostics::{DiagnosticReport, ERROR_PREVIEW_LIMIT};
use crate::orchestrator::Verdict;
use crate::result::HarnessResult;
use crate::stage::{StageOutcome, StageStatus};
use std::fmt;
use std::path::Path;

/// Something that happened during a run
#[derive(Debug, Clone, Copy)]
pub enum ReportEvent<'a> {
    /// Run is starting
    RunStarted {
        /// Application name
        app: &'a str,
        /// Target URL
        url: &'a str,
        /// Number of stages
        stages: usize,
    },
    /// A stage is starting
    StageStarted {
        /// 1-based stage number
        index: usize,
        /// Stage label
        label: &'a str,
    },
    /// A check passed
    CheckPassed(&'a Check),
    /// A screenshot was written
    ArtifactCaptured(&'a Artifact),
    /// A stage ended (passed or failed)
    StageFinished(&'a StageOutcome),
    /// Console diagnostics were collected
    Diagnostics(&'a DiagnosticReport),
    /// Run is over
    Finished(&'a Verdict),
}

impl fmt::Display for ReportEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { app, url, stages } => {
                write!(f, "Testing {app} at {url} ({stages} stages)")
            }
            Self::StageStarted { index, label } => write!(f, "{index}. {label}..."),
            Self::CheckPassed(check) => write!(f, "ok: {check}"),
            Self::ArtifactCaptured(artifact) => {
                write!(f, "screenshot: {}", artifact.path.display())
            }
            Self::StageFinished(outcome) => match &outcome.failure {
                Some(failure) => write!(
                    f,
                    "stage {} {}: {}",
                    outcome.index, outcome.status, failure.message
                ),
                None => write!(f, "stage {} {}", outcome.index, outcome.status),
            },
            Self::Diagnostics(report) => {
                write!(
                    f,
                    "console: {} errors, {} warnings",
                    report.error_count(),
                    report.warning_count()
                )?;
                for text in report.error_preview(ERROR_PREVIEW_LIMIT) {
                    write!(f, "\n  - {text}")?;
                }
                Ok(())
            }
            Self::Finished(verdict) => {
                if verdict.passed {
                    write!(f, "PASSED ({} artifacts)", verdict.artifacts.len())
                } else {
                    match &verdict.failure {
                        Some(failure) => write!(f, "FAILED: {failure}"),
                        None => write!(f, "FAILED"),
                    }
                }
            }
        }
    }
}

/// Receives report events
pub trait Reporter {
    /// Handle one event
    fn report(&mut self, event: &ReportEvent<'_>);
}

/// Records rendered events in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    lines: Vec<String>,
}

impl MemoryReporter {
    /// Create an empty reporter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered events in order
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, event: &ReportEvent<'_>) {
        self.lines.push(event.to_string());
    }
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _event: &ReportEvent<'_>) {}
}

/// Render a verdict as JUnit XML, one testcase per stage
#[must_use]
pub fn render_junit(verdict: &Verdict, suite_name: &str) -> String {
    let failures = verdict
        .stages
        .iter()
        .filter(|s| s.status == StageStatus::Failed)
        .count();
    let skipped = verdict
        .stages
        .iter()
        .filter(|s| s.status == StageStatus::NotRun)
        .count();

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
        escape_xml(suite_name),
        verdict.stages.len(),
        failures,
        skipped,
        verdict.elapsed_ms as f64 / 1000.0
    ));
    xml.push('\n');

    for stage in &verdict.stages {
        xml.push_str(&format!(
            r#"  <testcase name="{:02} {}" time="{:.3}">"#,
            stage.index,
            escape_xml(&stage.label),
            stage.elapsed_ms as f64 / 1000.0
        ));
        xml.push('\n');

        match stage.status {
            StageStatus::Failed => {
                if let Some(failure) = &stage.failure {
                    xml.push_str(&format!(
                        r#"    <failure message="{}" type="{}">{}</failure>"#,
                        escape_xml(&failure.message),
                        failure.kind,
                        escape_xml(&failure.chain.join("\n"))
                    ));
                    xml.push('\n');
                }
            }
            StageStatus::NotRun => xml.push_str("    <skipped/>\n"),
            StageStatus::Passed => {}
        }

        xml.push_str("  </testcase>\n");
    }

    xml.push_str("</testsuite>\n");
    xml
}

/// Write JUnit XML to a file
pub fn write_junit(verdict: &Verdict, suite_name: &str, output_path: &Path) -> HarnessResult<()> {
    let xml = render_junit(verdict, suite_name);
    std::fs::write(output_path, xml)?;
    Ok(())
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
