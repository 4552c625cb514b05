//! The Synthualizer verification protocol.
//!
//! [`ProtocolConfig`] carries every constant of the run (URL, control names,
//! hold duration, slider value, artifact directory, waits) with defaults that
//! reproduce the standard protocol. [`build_stages`] turns it into the fixed
//! eleven-stage sequence.

use crate::artifact::Checkpoint;
use crate::diagnostics::DiagnosticWindow;
use crate::locator::Locator;
use crate::result::{HarnessError, HarnessResult};
use crate::stage::{Stage, Step};
use crate::wait::{LoadState, SettlePoint, SettlePolicies, WaitOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default application URL
pub const DEFAULT_URL: &str = "http://localhost:3001";

/// Run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Application URL
    pub url: String,
    /// Text of the top-level heading
    pub app_name: String,
    /// Oscillator waveform buttons
    pub waveforms: Vec<String>,
    /// Keyboard note buttons
    pub notes: Vec<String>,
    /// Labelled filter controls
    pub filter_controls: Vec<String>,
    /// Waveform to click
    pub select_waveform: String,
    /// Note to hold (matched on exact text)
    pub hold_note: String,
    /// How long to hold the note
    pub hold_ms: u64,
    /// Value written to the first range control
    pub range_value: String,
    /// Where screenshots and the manifest go
    pub artifact_dir: PathBuf,
    /// Settle policy per settle point
    pub settle: SettlePolicies,
    /// Load-state wait options
    pub wait: WaitOptions,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let strings =
            |items: &[&str]| -> Vec<String> { items.iter().map(ToString::to_string).collect() };
        Self {
            url: DEFAULT_URL.to_string(),
            app_name: "Synthualizer".to_string(),
            waveforms: strings(&["Sine", "Square", "Saw", "Triangle"]),
            notes: strings(&["C", "D", "E", "F", "G", "A", "B"]),
            filter_controls: strings(&["Cutoff", "Resonance"]),
            select_waveform: "Square".to_string(),
            hold_note: "A".to_string(),
            hold_ms: 300,
            range_value: "500".to_string(),
            artifact_dir: PathBuf::from("/tmp"),
            settle: SettlePolicies::default(),
            wait: WaitOptions::default(),
        }
    }
}

impl ProtocolConfig {
    /// Parse from YAML; missing fields keep their defaults
    pub fn from_yaml_str(yaml: &str) -> HarnessResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: &Path) -> HarnessResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> HarnessResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject configurations the protocol cannot run
    pub fn validate(&self) -> HarnessResult<()> {
        if !(self.url.starts_with("http://")
            || self.url.starts_with("https://")
            || self.url.starts_with("file://"))
        {
            return Err(HarnessError::config(format!(
                "url must be http(s):// or file://, got '{}'",
                self.url
            )));
        }
        if self.app_name.trim().is_empty() {
            return Err(HarnessError::config("app_name must not be empty"));
        }
        if !self.waveforms.contains(&self.select_waveform) {
            return Err(HarnessError::config(format!(
                "select_waveform '{}' is not one of the waveforms",
                self.select_waveform
            )));
        }
        if !self.notes.contains(&self.hold_note) {
            return Err(HarnessError::config(format!(
                "hold_note '{}' is not one of the notes",
                self.hold_note
            )));
        }
        if self.filter_controls.is_empty() {
            return Err(HarnessError::config("filter_controls must not be empty"));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(HarnessError::config("wait.poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

fn heading(tag: &str, text: &str) -> Locator {
    Locator::tag(tag).with_text(text)
}

fn button(text: &str) -> Locator {
    Locator::tag("button").with_text(text)
}

fn range_input() -> Locator {
    Locator::tag("input").with_attribute("type", "range")
}

/// Build the stage sequence for a configuration
#[must_use]
pub fn build_stages(config: &ProtocolConfig) -> Vec<Stage> {
    let loading = Stage::new("Loading application").with_steps([
        Step::Navigate {
            url: config.url.clone(),
        },
        Step::WaitForLoad {
            state: LoadState::NetworkIdle,
        },
        Step::settle(SettlePoint::AfterNavigation),
        Step::capture(Checkpoint::Initial),
    ]);

    let header = Stage::new("Checking header").with_step(Step::assert_visible(
        heading("h1", &config.app_name),
        "Header",
    ));

    let visualization = Stage::new("Checking visualization container").with_step(
        Step::assert_visible(Locator::tag("canvas"), "Visualization canvas"),
    );

    let oscillator = Stage::new("Checking oscillator controls")
        .with_step(Step::assert_visible(
            heading("h2", "Oscillator"),
            "Oscillator section",
        ))
        .with_steps(
            config
                .waveforms
                .iter()
                .map(|wf| Step::assert_visible(button(wf), format!("{wf} button"))),
        );

    let filter = Stage::new("Checking filter controls")
        .with_step(Step::assert_visible(heading("h2", "Filter"), "Filter section"))
        .with_steps(config.filter_controls.iter().map(|name| {
            Step::assert_visible(
                Locator::tag("label").with_text(name),
                format!("{name} slider"),
            )
        }));

    let keyboard = Stage::new("Checking keyboard")
        .with_step(Step::assert_visible(
            heading("h3", "Keyboard"),
            "Keyboard section",
        ))
        .with_steps(
            config
                .notes
                .iter()
                .map(|note| Step::assert_count_at_least(button(note), 1, format!("{note} key"))),
        );

    let waveform = &config.select_waveform;
    let select = Stage::new(format!("Selecting {waveform} waveform")).with_steps([
        Step::click(button(waveform), format!("{waveform} button")),
        Step::settle(SettlePoint::AfterInteraction),
        Step::capture(Checkpoint::WaveformSelected),
    ]);

    let note = &config.hold_note;
    let play = Stage::new(format!("Playing {note} note")).with_steps([
        Step::HoldPointer {
            locator: Locator::tag("button").with_exact_text(note),
            subject: format!("{note} key"),
            duration_ms: config.hold_ms,
            capture: Some(Checkpoint::NoteHeld),
        },
        Step::settle(SettlePoint::AfterInteraction),
    ]);

    let cutoff = Stage::new("Adjusting cutoff slider").with_steps([
        Step::SetRangeValue {
            locator: range_input(),
            subject: "Cutoff slider".to_string(),
            value: config.range_value.clone(),
        },
        Step::settle(SettlePoint::AfterInteraction),
        Step::capture(Checkpoint::CutoffAdjusted),
    ]);

    let final_state =
        Stage::new("Capturing final state").with_step(Step::capture(Checkpoint::Final));

    let console = Stage::new("Checking console logs").with_step(Step::CollectDiagnostics {
        window: DiagnosticWindow {
            reload: true,
            wait_until: LoadState::NetworkIdle,
            settle: config.settle.get(SettlePoint::DiagnosticWindow),
        },
    });

    vec![
        loading,
        header,
        visualization,
        oscillator,
        filter,
        keyboard,
        select,
        play,
        cutoff,
        final_state,
        console,
    ]
}
