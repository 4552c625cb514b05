//! Wait mechanisms.
//!
//! Two kinds of waiting happen during a run:
//!
//! - **Load states** (`load`, `DOMContentLoaded`, `networkidle`) at navigation
//!   boundaries, polled against the provider with a deadline.
//! - **Settle delays** after navigation and interactions, to absorb
//!   application-side rendering and audio state changes that the DOM does not
//!   expose. These go through a [`WaitPolicy`] so they can be tightened from
//!   coarse sleeps to condition polling without touching call sites.

use crate::driver::Driver;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without resource activity)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Page load states (Playwright parity)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
    /// Wait for network to be idle (no requests for 500ms)
    NetworkIdle,
}

impl LoadState {
    /// Get the JavaScript event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Check whether the reported page activity satisfies this state
    #[must_use]
    pub fn is_satisfied_by(&self, activity: &PageActivity) -> bool {
        match self {
            Self::DomContentLoaded => {
                matches!(activity.ready_state.as_str(), "interactive" | "complete")
            }
            Self::Load => activity.ready_state == "complete",
            Self::NetworkIdle => {
                activity.ready_state == "complete"
                    && activity.idle_for_ms >= NETWORK_IDLE_THRESHOLD_MS
            }
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

/// Document readiness and network quiet time as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageActivity {
    /// `document.readyState`
    pub ready_state: String,
    /// Milliseconds since the last resource finished loading
    pub idle_for_ms: u64,
}

impl PageActivity {
    /// A fully loaded page that has been quiet for `idle_for_ms`
    #[must_use]
    pub fn complete(idle_for_ms: u64) -> Self {
        Self {
            ready_state: "complete".to_string(),
            idle_for_ms,
        }
    }
}

/// Options for load-state waits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Poll the provider until `state` is reached.
///
/// # Errors
///
/// Returns [`HarnessError::Timeout`] when the deadline passes, or any error
/// the provider raises while reporting page activity.
pub async fn wait_for_load_state<D: Driver + ?Sized>(
    driver: &D,
    state: LoadState,
    options: &WaitOptions,
) -> HarnessResult<()> {
    let start = Instant::now();
    loop {
        let activity = driver.page_activity().await?;
        if state.is_satisfied_by(&activity) {
            debug!(%state, elapsed_ms = start.elapsed().as_millis() as u64, "load state reached");
            return Ok(());
        }
        if start.elapsed() >= options.timeout() {
            return Err(HarnessError::Timeout {
                what: format!("load state '{state}'"),
                ms: options.timeout_ms,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// How a settle delay is realised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Sleep for a fixed period
    Fixed {
        /// Delay in milliseconds
        delay_ms: u64,
    },
    /// Poll until the network is idle, failing after `timeout_ms`
    PollUntilIdle {
        /// Deadline in milliseconds
        timeout_ms: u64,
        /// Polling interval in milliseconds
        poll_interval_ms: u64,
    },
}

impl WaitPolicy {
    /// Fixed delay policy
    #[must_use]
    pub const fn fixed_ms(delay_ms: u64) -> Self {
        Self::Fixed { delay_ms }
    }

    /// Poll-until-idle policy with the default interval
    #[must_use]
    pub const fn poll_until_idle_ms(timeout_ms: u64) -> Self {
        Self::PollUntilIdle {
            timeout_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Wait according to the policy
    ///
    /// # Errors
    ///
    /// `PollUntilIdle` fails with [`HarnessError::Timeout`] past its deadline.
    pub async fn settle<D: Driver + ?Sized>(&self, driver: &D) -> HarnessResult<()> {
        match *self {
            Self::Fixed { delay_ms } => {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Ok(())
            }
            Self::PollUntilIdle {
                timeout_ms,
                poll_interval_ms,
            } => {
                let options = WaitOptions::new()
                    .with_timeout(timeout_ms)
                    .with_poll_interval(poll_interval_ms);
                wait_for_load_state(driver, LoadState::NetworkIdle, &options).await
            }
        }
    }
}

/// Points in the protocol where a settle delay is inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlePoint {
    /// After navigation and load-state wait
    AfterNavigation,
    /// After a simulated interaction
    AfterInteraction,
    /// Inside the console diagnostic window
    DiagnosticWindow,
}

/// Settle policy for each [`SettlePoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlePolicies {
    /// Policy after navigation
    pub after_navigation: WaitPolicy,
    /// Policy after interactions
    pub after_interaction: WaitPolicy,
    /// Policy inside the diagnostic window
    pub diagnostic_window: WaitPolicy,
}

impl Default for SettlePolicies {
    fn default() -> Self {
        Self {
            after_navigation: WaitPolicy::fixed_ms(1000),
            after_interaction: WaitPolicy::fixed_ms(200),
            diagnostic_window: WaitPolicy::fixed_ms(1000),
        }
    }
}

impl SettlePolicies {
    /// Same policy at every point
    #[must_use]
    pub const fn uniform(policy: WaitPolicy) -> Self {
        Self {
            after_navigation: policy,
            after_interaction: policy,
            diagnostic_window: policy,
        }
    }

    /// Policy for a settle point
    #[must_use]
    pub const fn get(&self, point: SettlePoint) -> WaitPolicy {
        match point {
            SettlePoint::AfterNavigation => self.after_navigation,
            SettlePoint::AfterInteraction => self.after_interaction,
            SettlePoint::DiagnosticWindow => self.diagnostic_window,
        }
    }
}
