//! Orchestrator - runs the protocol and produces a [`Verdict`].
//!
//! ```text
//! Session ──► stage 1 ──► stage 2 ──► ... ──► stage 11 ──► close
//!                │ fault                                   ▲
//!                └──► remaining stages NotRun ─────────────┘
//! ```
//!
//! The orchestrator is the only place that catches faults. Stages run in
//! order; the first fault fails its stage and every later stage is recorded
//! as not run. The session is closed on every path. Console diagnostics are
//! reported but never affect `passed`.

use crate::artifact::{Artifact, ArtifactSink};
use crate::assertion::{assert_count_at_least, assert_visible};
use crate::diagnostics::{self, DiagnosticReport};
use crate::driver::Driver;
use crate::interaction::{self, release};
use crate::protocol::{build_stages, ProtocolConfig};
use crate::reporter::{ReportEvent, Reporter};
use crate::result::HarnessResult;
use crate::session::Session;
use crate::stage::{Stage, StageFailure, StageOutcome, StageStatus, Step};
use crate::wait::wait_for_load_state;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Aggregate result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// True iff every stage passed and the session closed cleanly
    pub passed: bool,
    /// Per-stage outcomes in protocol order
    pub stages: Vec<StageOutcome>,
    /// Screenshots written, in capture order
    pub artifacts: Vec<Artifact>,
    /// Console diagnostics, when the diagnostic stage ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticReport>,
    /// First fault, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    /// Total wall time
    pub elapsed_ms: u64,
}

impl Verdict {
    /// Process exit code for this verdict
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.passed {
            0
        } else {
            1
        }
    }

    /// Number of stages that passed
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.status.is_passed()).count()
    }
}

#[derive(Debug, Default)]
struct RunRecord {
    artifacts: Vec<Artifact>,
    diagnostics: Option<DiagnosticReport>,
}

/// Runs a stage sequence against one session
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: ProtocolConfig,
    stages: Vec<Stage>,
    sink: ArtifactSink,
}

impl Orchestrator {
    /// Standard protocol for `config`
    #[must_use]
    pub fn new(config: ProtocolConfig) -> Self {
        let stages = build_stages(&config);
        let sink = ArtifactSink::new(&config.artifact_dir);
        Self {
            config,
            stages,
            sink,
        }
    }

    /// Replace the stage sequence
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Stage>) -> Self {
        self.stages = stages;
        self
    }

    /// Run configuration
    #[must_use]
    pub const fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Stage sequence
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Artifact sink
    #[must_use]
    pub const fn sink(&self) -> &ArtifactSink {
        &self.sink
    }

    /// Run every stage, close the session, and return the verdict
    pub async fn run<D: Driver>(
        &self,
        mut session: Session<D>,
        reporter: &mut dyn Reporter,
    ) -> Verdict {
        let started = Instant::now();
        reporter.report(&ReportEvent::RunStarted {
            app: &self.config.app_name,
            url: &self.config.url,
            stages: self.stages.len(),
        });

        let mut record = RunRecord::default();
        let mut outcomes = Vec::with_capacity(self.stages.len());
        let mut failure: Option<StageFailure> = None;

        for (i, stage) in self.stages.iter().enumerate() {
            let index = i + 1;
            if failure.is_some() {
                outcomes.push(StageOutcome::not_run(index, &stage.label));
                continue;
            }

            reporter.report(&ReportEvent::StageStarted {
                index,
                label: &stage.label,
            });
            info!(stage = index, label = %stage.label, "stage started");

            let stage_started = Instant::now();
            let mut checks = Vec::new();
            let result = self
                .run_stage(session.driver_mut(), stage, &mut checks, &mut record, reporter)
                .await;
            let elapsed_ms = stage_started.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(()) => {
                    info!(stage = index, elapsed_ms, "stage passed");
                    StageOutcome {
                        index,
                        label: stage.label.clone(),
                        status: StageStatus::Passed,
                        checks,
                        elapsed_ms,
                        failure: None,
                    }
                }
                Err(e) => {
                    let stage_failure = StageFailure::in_stage(index, &stage.label, &e);
                    error!(stage = index, kind = %stage_failure.kind, error = %e, "stage failed");
                    failure = Some(stage_failure.clone());
                    StageOutcome {
                        index,
                        label: stage.label.clone(),
                        status: StageStatus::Failed,
                        checks,
                        elapsed_ms,
                        failure: Some(stage_failure),
                    }
                }
            };
            reporter.report(&ReportEvent::StageFinished(&outcome));
            outcomes.push(outcome);
        }

        if let Err(e) = session.close().await {
            warn!(error = %e, "session did not close cleanly");
            if failure.is_none() {
                failure = Some(StageFailure::teardown(&e));
            }
        }

        let verdict = Verdict {
            passed: failure.is_none(),
            stages: outcomes,
            artifacts: record.artifacts,
            diagnostics: record.diagnostics,
            failure,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        match self.sink.write_manifest(&verdict).await {
            Ok(path) => info!(path = %path.display(), "run manifest written"),
            Err(e) => warn!(error = %e, "could not write run manifest"),
        }

        reporter.report(&ReportEvent::Finished(&verdict));
        verdict
    }

    async fn run_stage<D: Driver>(
        &self,
        driver: &mut D,
        stage: &Stage,
        checks: &mut Vec<crate::assertion::Check>,
        record: &mut RunRecord,
        reporter: &mut dyn Reporter,
    ) -> HarnessResult<()> {
        for step in &stage.steps {
            self.run_step(driver, step, checks, record, reporter).await?;
        }
        Ok(())
    }

    async fn capture<D: Driver>(
        &self,
        driver: &D,
        checkpoint: crate::artifact::Checkpoint,
        record: &mut RunRecord,
        reporter: &mut dyn Reporter,
    ) -> HarnessResult<()> {
        let artifact = self.sink.capture(driver, checkpoint).await?;
        reporter.report(&ReportEvent::ArtifactCaptured(&artifact));
        record.artifacts.push(artifact);
        Ok(())
    }

    async fn run_step<D: Driver>(
        &self,
        driver: &mut D,
        step: &Step,
        checks: &mut Vec<crate::assertion::Check>,
        record: &mut RunRecord,
        reporter: &mut dyn Reporter,
    ) -> HarnessResult<()> {
        match step {
            Step::Navigate { url } => driver.navigate(url).await,
            Step::WaitForLoad { state } => {
                wait_for_load_state(&*driver, *state, &self.config.wait).await
            }
            Step::Settle { point } => self.config.settle.get(*point).settle(&*driver).await,
            Step::Capture { checkpoint } => {
                self.capture(&*driver, *checkpoint, record, reporter).await
            }
            Step::AssertVisible { locator, subject } => {
                let check = assert_visible(&*driver, locator, subject).await?;
                reporter.report(&ReportEvent::CheckPassed(&check));
                checks.push(check);
                Ok(())
            }
            Step::AssertCountAtLeast {
                locator,
                min,
                subject,
            } => {
                let check = assert_count_at_least(&*driver, locator, *min, subject).await?;
                reporter.report(&ReportEvent::CheckPassed(&check));
                checks.push(check);
                Ok(())
            }
            Step::Click { locator, subject } => interaction::click(driver, locator, subject).await,
            Step::HoldPointer {
                locator,
                subject,
                duration_ms,
                capture,
            } => {
                let hold = interaction::press(driver, locator, subject).await?;
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                if let Some(checkpoint) = capture {
                    if let Err(e) = self.capture(&*driver, *checkpoint, record, reporter).await {
                        if let Err(release_err) = release(driver, hold).await {
                            warn!(error = %release_err, "pointer release after failed capture");
                        }
                        return Err(e);
                    }
                }
                release(driver, hold).await
            }
            Step::SetRangeValue {
                locator,
                subject,
                value,
            } => interaction::set_range_value(driver, locator, subject, value).await,
            Step::CollectDiagnostics { window } => {
                let report = diagnostics::collect(driver, *window, &self.config.wait).await?;
                for message in report.errors() {
                    warn!(text = %message.text, "console error");
                }
                reporter.report(&ReportEvent::Diagnostics(&report));
                record.diagnostics = Some(report);
                Ok(())
            }
        }
    }
}
