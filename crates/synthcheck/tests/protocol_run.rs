//! End-to-end protocol runs against an in-memory Synthualizer page.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{fast_config, synthualizer};
use proptest::prelude::*;
use synthcheck::{
    assert_count_at_least, Checkpoint, ConsoleMessage, ElementSnapshot, FaultKind, Locator,
    MemoryReporter, MockDriver, NullReporter, Orchestrator, Session, StageStatus,
};

#[tokio::test]
async fn full_protocol_passes_and_writes_every_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let driver = synthualizer();
    let history = driver.history();
    let orchestrator = Orchestrator::new(fast_config(dir.path()));

    let verdict = orchestrator
        .run(Session::new(driver), &mut NullReporter)
        .await;

    assert!(verdict.passed, "unexpected failure: {:?}", verdict.failure);
    assert_eq!(verdict.stages.len(), 11);
    assert!(verdict.stages.iter().all(|s| s.status == StageStatus::Passed));

    let checkpoints: Vec<_> = verdict.artifacts.iter().map(|a| a.checkpoint).collect();
    assert_eq!(checkpoints, Checkpoint::ALL.to_vec());
    for artifact in &verdict.artifacts {
        assert_eq!(
            artifact.path,
            dir.path().join(artifact.checkpoint.file_name())
        );
        let bytes = std::fs::read(&artifact.path).unwrap();
        assert!(!bytes.is_empty());
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    assert!(history.was_called("navigate:http://localhost:3001"));
    assert!(history
        .calls()
        .iter()
        .any(|c| c.starts_with("set_value:") && c.ends_with("#0=500")));
    assert_eq!(history.count("mouse_down"), 2);
    assert_eq!(history.count("reload"), 1);
    assert_eq!(history.count("close"), 1);
    assert!(verdict.diagnostics.is_some());
    assert!(dir.path().join("synthualizer_report.json").exists());
}

#[tokio::test]
async fn missing_resonance_fails_stage_five_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = synthualizer();
    driver.remove_elements(|e| e.tag == "label" && e.text == "Resonance");
    let history = driver.history();

    let verdict = Orchestrator::new(fast_config(dir.path()))
        .run(Session::new(driver), &mut NullReporter)
        .await;

    assert!(!verdict.passed);
    assert_eq!(verdict.exit_code(), 1);
    let failure = verdict.failure.as_ref().unwrap();
    assert_eq!(failure.stage, Some(5));
    assert_eq!(failure.kind, FaultKind::NotFound);
    assert_eq!(failure.message, "Resonance slider not found");

    assert!(verdict.stages[..4]
        .iter()
        .all(|s| s.status == StageStatus::Passed));
    assert_eq!(verdict.stages[4].status, StageStatus::Failed);
    assert!(verdict.stages[5..]
        .iter()
        .all(|s| s.status == StageStatus::NotRun));

    assert_eq!(verdict.artifacts.len(), 1);
    assert!(!history.was_called("mouse_down"));
    assert_eq!(history.count("close"), 1);
}

#[tokio::test]
async fn each_missing_subject_is_named() {
    let cases: [(&str, &str, usize); 5] = [
        ("canvas", "Visualization canvas", 3),
        ("Oscillator", "Oscillator section", 4),
        ("Triangle", "Triangle button", 4),
        ("Keyboard", "Keyboard section", 6),
        ("B", "B key", 6),
    ];
    for (removed, subject, stage) in cases {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = synthualizer();
        driver.remove_elements(|e| e.tag == removed || e.text == removed);
        let verdict = Orchestrator::new(fast_config(dir.path()))
            .run(Session::new(driver), &mut NullReporter)
            .await;
        let failure = verdict.failure.unwrap();
        assert_eq!(failure.message, format!("{subject} not found"));
        assert_eq!(failure.stage, Some(stage), "removing {removed}");
    }
}

#[tokio::test]
async fn console_errors_do_not_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = synthualizer();
    let mut console: Vec<_> = (0..7)
        .map(|i| ConsoleMessage::error(format!("AudioContext error {i}")))
        .collect();
    console.push(ConsoleMessage::warning("The AudioContext was not allowed to start"));
    console.push(ConsoleMessage::log("synth ready"));
    driver.set_console_on_load(console);

    let mut reporter = MemoryReporter::new();
    let verdict = Orchestrator::new(fast_config(dir.path()))
        .run(Session::new(driver), &mut reporter)
        .await;

    assert!(verdict.passed);
    let diagnostics = verdict.diagnostics.unwrap();
    // only the reload inside the diagnostic window is observed
    assert_eq!(diagnostics.error_count(), 7);
    assert_eq!(diagnostics.warning_count(), 1);
    assert_eq!(diagnostics.other().len(), 1);

    let line = reporter
        .lines()
        .iter()
        .find(|l| l.starts_with("console:"))
        .unwrap();
    assert!(line.contains("AudioContext error 4"));
    assert!(!line.contains("AudioContext error 5"));
}

#[tokio::test]
async fn navigation_failure_is_session_fault_and_still_closes() {
    let dir = tempfile::tempdir().unwrap();
    let mut driver = synthualizer();
    driver.fail_on("navigate");
    let history = driver.history();

    let verdict = Orchestrator::new(fast_config(dir.path()))
        .run(Session::new(driver), &mut NullReporter)
        .await;

    let failure = verdict.failure.unwrap();
    assert_eq!(failure.stage, Some(1));
    assert_eq!(failure.kind, FaultKind::SessionFault);
    assert!(verdict.artifacts.is_empty());
    assert_eq!(history.count("close"), 1);
}

#[tokio::test]
async fn repeated_runs_report_identically() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(fast_config(dir.path()));

    let mut first = MemoryReporter::new();
    let verdict_a = orchestrator
        .run(Session::new(synthualizer()), &mut first)
        .await;
    let mut second = MemoryReporter::new();
    let verdict_b = orchestrator
        .run(Session::new(synthualizer()), &mut second)
        .await;

    assert_eq!(first.lines(), second.lines());
    assert_eq!(verdict_a.passed, verdict_b.passed);
    let labels = |v: &synthcheck::Verdict| {
        v.stages
            .iter()
            .map(|s| (s.label.clone(), s.status))
            .collect::<Vec<_>>()
    };
    assert_eq!(labels(&verdict_a), labels(&verdict_b));
}

#[tokio::test]
async fn hold_targets_exact_note_not_saw() {
    let dir = tempfile::tempdir().unwrap();
    let driver = synthualizer();
    let history = driver.history();
    let verdict = Orchestrator::new(fast_config(dir.path()))
        .run(Session::new(driver), &mut NullReporter)
        .await;
    assert!(verdict.passed);

    // Saw sits at y=520 (center 540); the A key sits at y=1305 (center 1325)
    let downs: Vec<_> = history
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("mouse_down"))
        .collect();
    assert_eq!(downs[1], "mouse_down:80,1325");
}

fn count_holds(available: usize, min: usize) -> bool {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let elements = (0..available)
        .map(|i| ElementSnapshot::new("button").with_text(format!("C{i}")))
        .collect();
    let driver = MockDriver::with_elements(elements);
    runtime
        .block_on(assert_count_at_least(
            &driver,
            &Locator::tag("button").with_text("C"),
            min,
            "C key",
        ))
        .is_ok()
}

proptest! {
    #[test]
    fn prop_count_check_is_threshold(available in 0usize..8, min in 0usize..10) {
        prop_assert_eq!(count_holds(available, min), min <= available);
    }

    #[test]
    fn prop_count_check_is_monotonic(available in 0usize..8, min in 1usize..10) {
        if count_holds(available, min) {
            prop_assert!(count_holds(available, min - 1));
        }
    }
}
