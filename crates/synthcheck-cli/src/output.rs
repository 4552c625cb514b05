//! Output formatting and progress reporting

use crate::error::{CliError, CliResult};
use console::{style, Style, Term};
use std::path::Path;
use synthcheck::{
    write_junit, Artifact, DiagnosticReport, ReportEvent, Reporter, StageStatus, Verdict,
    ERROR_PREVIEW_LIMIT,
};

/// Renders the run on stdout as it happens
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn marker(&self, symbol: &'static str, plain: &'static str, color: Style) -> String {
        if self.use_color {
            color.bold().apply_to(symbol).to_string()
        } else {
            plain.to_string()
        }
    }

    fn ok(&self) -> String {
        self.marker("✓", "PASS", Style::new().green())
    }

    fn fail(&self) -> String {
        self.marker("✗", "FAIL", Style::new().red())
    }

    fn warn(&self) -> String {
        self.marker("⚠", "WARN", Style::new().yellow())
    }

    fn header(&self, title: &str) -> String {
        if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        }
    }

    fn diagnostics(&self, report: &DiagnosticReport) -> Vec<String> {
        let mut lines = vec![String::new(), self.header("Console diagnostics")];
        let errors = report.error_count();
        if errors == 0 {
            lines.push(format!("{} no console errors", self.ok()));
        } else {
            lines.push(format!("{} {errors} console errors", self.warn()));
            for text in report.error_preview(ERROR_PREVIEW_LIMIT) {
                lines.push(format!("    {text}"));
            }
            if errors > ERROR_PREVIEW_LIMIT {
                lines.push(format!("    ... and {} more", errors - ERROR_PREVIEW_LIMIT));
            }
        }
        lines.push(format!("  {} warnings", report.warning_count()));
        lines
    }

    fn manifest(&self, artifacts: &[Artifact]) -> Vec<String> {
        let mut lines = vec![String::new(), self.header("Screenshots")];
        for artifact in artifacts {
            lines.push(format!(
                "  {:<20} {} ({}x{}, {} bytes)",
                artifact.checkpoint.to_string(),
                artifact.path.display(),
                artifact.width,
                artifact.height,
                artifact.bytes
            ));
        }
        lines
    }

    fn verdict(&self, verdict: &Verdict) -> Vec<String> {
        let mut lines = vec![String::new()];
        let secs = verdict.elapsed_ms as f64 / 1000.0;
        let total = verdict.stages.len();
        let passed = verdict.passed_count();
        let skipped = verdict
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::NotRun)
            .count();
        if verdict.passed {
            let status = if self.use_color {
                Style::new().green().bold().apply_to("PASSED").to_string()
            } else {
                "PASSED".to_string()
            };
            lines.push(format!("{status} {passed}/{total} stages in {secs:.2}s"));
            lines.extend(self.manifest(&verdict.artifacts));
        } else {
            let status = if self.use_color {
                Style::new().red().bold().apply_to("FAILED").to_string()
            } else {
                "FAILED".to_string()
            };
            lines.push(format!(
                "{status} {passed}/{total} stages in {secs:.2}s ({skipped} not run)"
            ));
            if !verdict.artifacts.is_empty() {
                lines.extend(self.manifest(&verdict.artifacts));
            }
        }
        lines
    }

    /// Lines an event renders to; empty when nothing is shown
    #[must_use]
    pub fn render(&self, event: &ReportEvent<'_>) -> Vec<String> {
        match event {
            ReportEvent::StageFinished(outcome) if outcome.status == StageStatus::Failed => {
                let message = outcome
                    .failure
                    .as_ref()
                    .map_or_else(String::new, |f| f.message.clone());
                return vec![format!("{} {message}", self.fail())];
            }
            ReportEvent::Finished(verdict) if !verdict.passed => return self.verdict(verdict),
            _ if self.quiet => return Vec::new(),
            _ => {}
        }

        match event {
            ReportEvent::RunStarted { app, url, stages } => vec![
                self.header(&format!("{app} acceptance run")),
                format!("Target: {url} ({stages} stages)"),
            ],
            ReportEvent::StageStarted { index, label } => {
                vec![String::new(), format!("{index}. {label}...")]
            }
            ReportEvent::CheckPassed(check) => vec![format!("  {} {check}", self.ok())],
            ReportEvent::ArtifactCaptured(artifact) => vec![format!(
                "  Screenshot saved: {}",
                artifact.path.display()
            )],
            ReportEvent::Diagnostics(report) => self.diagnostics(report),
            ReportEvent::Finished(verdict) => self.verdict(verdict),
            ReportEvent::StageFinished(_) => Vec::new(),
        }
    }
}

impl Reporter for ProgressReporter {
    fn report(&mut self, event: &ReportEvent<'_>) {
        for line in self.render(event) {
            let _ = self.term.write_line(&line);
        }
    }
}

/// Write the optional JUnit report, then turn the verdict into the exit result.
///
/// A report that cannot be written is logged and never replaces the run's
/// own outcome.
pub fn finish(verdict: Verdict, junit: Option<&Path>, suite_name: &str) -> CliResult<()> {
    if let Some(path) = junit {
        match write_junit(&verdict, suite_name, path) {
            Ok(()) => tracing::info!(path = %path.display(), "JUnit report written"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "JUnit report not written"),
        }
    }

    if verdict.passed {
        return Ok(());
    }
    match verdict.failure {
        Some(failure) => Err(CliError::StageFailed { failure }),
        None => Err(CliError::output("run failed without a recorded fault")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use synthcheck::{
        Check, Checkpoint, ConsoleMessage, HarnessError, Predicate, StageFailure, StageOutcome,
    };

    fn plain() -> ProgressReporter {
        ProgressReporter::new(false, false)
    }

    fn artifact() -> Artifact {
        Artifact {
            checkpoint: Checkpoint::Initial,
            path: PathBuf::from("/tmp/synthualizer_initial.png"),
            bytes: 2048,
            width: 1280,
            height: 1600,
            sha256: "00".to_string(),
        }
    }

    fn verdict(passed: bool) -> Verdict {
        let mut stages = vec![StageOutcome {
            index: 1,
            label: "Loading application".to_string(),
            status: StageStatus::Passed,
            checks: Vec::new(),
            elapsed_ms: 10,
            failure: None,
        }];
        let failure = (!passed).then(|| {
            StageFailure::in_stage(
                2,
                "Checking header",
                &HarnessError::not_found("Header"),
            )
        });
        if !passed {
            stages.push(StageOutcome::not_run(2, "Checking header"));
        }
        Verdict {
            passed,
            stages,
            artifacts: vec![artifact()],
            diagnostics: None,
            failure,
            elapsed_ms: 1500,
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn test_check_line_plain() {
            let check = Check {
                subject: "Header".to_string(),
                predicate: Predicate::Visible,
            };
            assert_eq!(
                plain().render(&ReportEvent::CheckPassed(&check)),
                vec!["  PASS Header visible"]
            );
        }

        #[test]
        fn test_stage_header() {
            let lines = plain().render(&ReportEvent::StageStarted {
                index: 3,
                label: "Checking visualization container",
            });
            assert_eq!(lines[1], "3. Checking visualization container...");
        }

        #[test]
        fn test_passed_verdict_lists_artifacts() {
            let v = verdict(true);
            let lines = plain().render(&ReportEvent::Finished(&v));
            assert!(lines.iter().any(|l| l == "PASSED 1/1 stages in 1.50s"));
            assert!(lines
                .iter()
                .any(|l| l.contains("/tmp/synthualizer_initial.png (1280x1600, 2048 bytes)")));
        }

        #[test]
        fn test_failed_verdict_counts_not_run() {
            let v = verdict(false);
            let lines = plain().render(&ReportEvent::Finished(&v));
            assert!(lines
                .iter()
                .any(|l| l == "FAILED 1/2 stages in 1.50s (1 not run)"));
        }

        #[test]
        fn test_diagnostics_block_truncates() {
            let messages = (0..7)
                .map(|i| ConsoleMessage::error(format!("err {i}")))
                .chain([ConsoleMessage::warning("w")])
                .collect();
            let report = DiagnosticReport::new(messages);
            let lines = plain().render(&ReportEvent::Diagnostics(&report));
            assert!(lines.iter().any(|l| l == "WARN 7 console errors"));
            assert!(lines.iter().any(|l| l.trim() == "err 4"));
            assert!(!lines.iter().any(|l| l.trim() == "err 5"));
            assert!(lines.iter().any(|l| l.trim() == "... and 2 more"));
            assert!(lines.iter().any(|l| l.trim() == "1 warnings"));
        }

        #[test]
        fn test_clean_console() {
            let report = DiagnosticReport::new(Vec::new());
            let lines = plain().render(&ReportEvent::Diagnostics(&report));
            assert!(lines.iter().any(|l| l == "PASS no console errors"));
        }
    }

    mod quiet_tests {
        use super::*;

        #[test]
        fn test_quiet_hides_progress() {
            let reporter = ProgressReporter::new(false, true);
            assert!(reporter
                .render(&ReportEvent::StageStarted {
                    index: 1,
                    label: "Loading application",
                })
                .is_empty());
            let v = verdict(true);
            assert!(reporter.render(&ReportEvent::Finished(&v)).is_empty());
        }

        #[test]
        fn test_quiet_still_shows_failures() {
            let reporter = ProgressReporter::new(false, true);
            let v = verdict(false);
            assert!(!reporter.render(&ReportEvent::Finished(&v)).is_empty());
        }
    }

    mod finish_tests {
        use super::*;
        use synthcheck::FaultKind;

        fn unwritable() -> PathBuf {
            PathBuf::from("/nonexistent/synthcheck/junit.xml")
        }

        #[test]
        fn test_failed_run_survives_unwritable_junit() {
            let err = finish(verdict(false), Some(&unwritable()), "Synthualizer").unwrap_err();
            match err {
                CliError::StageFailed { failure } => {
                    assert_eq!(failure.stage, Some(2));
                    assert_eq!(failure.kind, FaultKind::NotFound);
                }
                other => panic!("expected StageFailed, got {other:?}"),
            }
        }

        #[test]
        fn test_passed_run_survives_unwritable_junit() {
            assert!(finish(verdict(true), Some(&unwritable()), "Synthualizer").is_ok());
        }

        #[test]
        fn test_junit_written_for_failed_run() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("junit.xml");
            let err = finish(verdict(false), Some(&path), "Synthualizer").unwrap_err();
            assert!(matches!(err, CliError::StageFailed { .. }));
            let xml = std::fs::read_to_string(&path).unwrap();
            assert!(xml.contains("Synthualizer"));
        }

        #[test]
        fn test_failed_run_without_fault() {
            let mut v = verdict(false);
            v.failure = None;
            assert!(matches!(
                finish(v, None, "Synthualizer").unwrap_err(),
                CliError::Output { .. }
            ));
        }
    }

    #[test]
    fn test_colored_markers() {
        let reporter = ProgressReporter::new(true, false);
        assert!(reporter.ok().contains('✓'));
        assert!(reporter.fail().contains('✗'));
    }
}
