//! Synthcheck: browser-driven acceptance harness for the Synthualizer UI
//!
//! Drives a running Synthualizer instance through a real browser, verifies
//! its structure (header, visualization canvas, oscillator, filter and
//! keyboard sections), exercises the controls (waveform click, held note,
//! cutoff slider), writes a screenshot per checkpoint and reports console
//! diagnostics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Orchestrator                               │
//! │   stages 1..11, fail-fast, owns the Session                     │
//! ├───────────────┬───────────────┬───────────────┬─────────────────┤
//! │ assertion     │ interaction   │ artifact      │ diagnostics     │
//! │ visible/count │ click/hold/   │ full-page PNG │ console window  │
//! │               │ set value     │ per checkpoint│ (advisory)      │
//! ├───────────────┴───────────────┴───────────────┴─────────────────┤
//! │        Driver trait: ChromiumDriver (CDP) │ MockDriver          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```no_run
//! use synthcheck::{MockDriver, NullReporter, Orchestrator, ProtocolConfig, Session};
//!
//! # async fn demo() {
//! let orchestrator = Orchestrator::new(ProtocolConfig::default());
//! let verdict = orchestrator
//!     .run(Session::new(MockDriver::new()), &mut NullReporter)
//!     .await;
//! println!("passed: {}", verdict.passed);
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod artifact;
mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod diagnostics;
mod driver;
mod interaction;
mod locator;
mod orchestrator;
mod protocol;
mod reporter;
mod result;
mod session;
mod stage;
mod wait;

pub use artifact::{Artifact, ArtifactSink, Checkpoint, MANIFEST_FILE};
pub use assertion::{assert_count_at_least, assert_visible, Check, Predicate};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use diagnostics::{
    collect as collect_diagnostics, collect_with as collect_console_with, ConsoleClass,
    ConsoleMessage, ConsoleSeverity, DiagnosticReport, DiagnosticWindow, ERROR_PREVIEW_LIMIT,
};
pub use driver::{solid_png, CallHistory, Driver, DriverConfig, MockDriver, Screenshot};
pub use interaction::{click, hold_pointer, press, release, set_range_value, PointerHold};
pub use locator::{BoundingBox, ElementSnapshot, Locator, Point, TextMatch};
pub use orchestrator::{Orchestrator, Verdict};
pub use protocol::{build_stages, ProtocolConfig, DEFAULT_URL};
pub use reporter::{
    render_junit, write_junit, MemoryReporter, NullReporter, ReportEvent, Reporter,
};
pub use result::{FaultKind, HarnessError, HarnessResult};
pub use session::Session;
pub use stage::{Stage, StageFailure, StageOutcome, StageStatus, Step};
pub use wait::{
    wait_for_load_state, LoadState, PageActivity, SettlePoint, SettlePolicies, WaitOptions,
    WaitPolicy, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS, NETWORK_IDLE_THRESHOLD_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::artifact::*;
    pub use super::assertion::*;
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::diagnostics::{
        ConsoleClass, ConsoleMessage, ConsoleSeverity, DiagnosticReport, DiagnosticWindow,
    };
    pub use super::driver::*;
    pub use super::interaction::*;
    pub use super::locator::*;
    pub use super::orchestrator::*;
    pub use super::protocol::*;
    pub use super::reporter::*;
    pub use super::result::*;
    pub use super::session::*;
    pub use super::stage::*;
    pub use super::wait::*;
}
