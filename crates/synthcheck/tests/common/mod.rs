//! Shared fixtures: an in-memory Synthualizer page.

#![allow(dead_code)]

use std::path::Path;
use synthcheck::{
    BoundingBox, ElementSnapshot, MockDriver, ProtocolConfig, SettlePolicies, WaitPolicy,
};

fn at(tag: &str, text: &str, y: f64) -> ElementSnapshot {
    ElementSnapshot::new(tag)
        .with_text(text)
        .with_bounding_box(BoundingBox::new(20.0, y, 120.0, 40.0))
}

/// The elements a healthy Synthualizer build renders, in document order
pub fn synthualizer_dom() -> Vec<ElementSnapshot> {
    let mut dom = vec![
        at("h1", "Synthualizer", 10.0),
        ElementSnapshot::new("canvas").with_bounding_box(BoundingBox::new(0.0, 60.0, 800.0, 300.0)),
        at("h2", "Oscillator", 380.0),
    ];
    for (i, wf) in ["Sine", "Square", "Saw", "Triangle"].iter().enumerate() {
        dom.push(at("button", wf, 420.0 + 50.0 * i as f64));
    }
    dom.push(at("h2", "Filter", 640.0));
    dom.push(at("label", "Cutoff", 680.0));
    dom.push(
        at("input", "", 720.0)
            .with_attribute("type", "range")
            .with_attribute("value", "2000"),
    );
    dom.push(at("label", "Resonance", 760.0));
    dom.push(
        at("input", "", 800.0)
            .with_attribute("type", "range")
            .with_attribute("value", "1"),
    );
    dom.push(at("h3", "Keyboard", 850.0));
    for (i, note) in ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"]
        .iter()
        .enumerate()
    {
        dom.push(at("button", note, 900.0 + 45.0 * i as f64));
    }
    dom
}

/// Mock driver serving [`synthualizer_dom`]
pub fn synthualizer() -> MockDriver {
    MockDriver::with_elements(synthualizer_dom())
}

/// Default protocol with zero settle delays, a short hold and `dir` for artifacts
pub fn fast_config(dir: &Path) -> ProtocolConfig {
    ProtocolConfig {
        artifact_dir: dir.to_path_buf(),
        settle: SettlePolicies::uniform(WaitPolicy::fixed_ms(0)),
        hold_ms: 5,
        ..ProtocolConfig::default()
    }
}
