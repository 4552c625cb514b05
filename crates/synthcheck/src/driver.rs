//! Driver - abstract browser capability provider.
//!
//! The harness never talks to a browser engine directly. Everything it needs
//! (navigation, DOM snapshots, pointer input, value setting, screenshots,
//! console subscription, teardown) goes through the [`Driver`] trait.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  Driver (async trait)                                       │
//! ├────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐      ┌──────────────────────────┐ │
//! │  │  ChromiumDriver     │      │  MockDriver              │ │
//! │  │  CDP via            │      │  in-memory DOM,          │ │
//! │  │  chromiumoxide      │      │  scripted console/faults │ │
//! │  └─────────────────────┘      └──────────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```

use crate::diagnostics::ConsoleMessage;
use crate::locator::{ElementSnapshot, Locator, Point};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::PageActivity;
use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use std::collections::HashSet;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Screenshot data with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    /// Raw PNG data
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Screenshot {
    /// Create a new screenshot
    #[must_use]
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot is valid (has data)
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty() && self.width > 0 && self.height > 0
    }
}

/// Encode a solid-colour PNG of the given size
pub fn solid_png(width: u32, height: u32, color: [u8; 4]) -> HarnessResult<Vec<u8>> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut png_data = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .map_err(|e| HarnessError::session(format!("PNG encoding failed: {e}")))?;
    Ok(png_data)
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Enable or disable the sandbox (containers usually need it off)
    #[must_use]
    pub const fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }
}

/// Abstract browser capability provider.
///
/// `query_all` returns structural (CSS) matches in document order, each
/// carrying its position in that list as `index`. Text filtering happens on
/// the Rust side in [`Driver::resolve`], so `index` stays addressable by the
/// provider for follow-up calls such as [`Driver::set_value`].
#[async_trait]
pub trait Driver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> HarnessResult<()>;

    /// Reload the current page
    async fn reload(&mut self) -> HarnessResult<()>;

    /// Get current URL
    async fn current_url(&self) -> HarnessResult<String>;

    /// Document readiness and network quiet time
    async fn page_activity(&self) -> HarnessResult<PageActivity>;

    /// Snapshot all elements matching the locator's structural part
    async fn query_all(&self, locator: &Locator) -> HarnessResult<Vec<ElementSnapshot>>;

    /// Snapshot all elements matching the full locator, in document order
    async fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementSnapshot>> {
        let candidates = self.query_all(locator).await?;
        Ok(candidates
            .into_iter()
            .filter(|element| locator.matches(element))
            .collect())
    }

    /// Scroll the `index`-th structural match into view; false if it is gone
    async fn scroll_into_view(&mut self, locator: &Locator, index: usize) -> HarnessResult<bool>;

    /// Move the pointer
    async fn mouse_move(&mut self, point: Point) -> HarnessResult<()>;

    /// Press the primary button
    async fn mouse_down(&mut self, point: Point) -> HarnessResult<()>;

    /// Release the primary button
    async fn mouse_up(&mut self, point: Point) -> HarnessResult<()>;

    /// Set an input's value and fire `input`/`change`; false if it is gone
    async fn set_value(
        &mut self,
        locator: &Locator,
        index: usize,
        value: &str,
    ) -> HarnessResult<bool>;

    /// Take a PNG screenshot
    async fn screenshot(&self, full_page: bool) -> HarnessResult<Screenshot>;

    /// Start buffering console messages
    async fn start_console_capture(&mut self) -> HarnessResult<()>;

    /// Stop buffering and return everything observed, in arrival order
    async fn stop_console_capture(&mut self) -> HarnessResult<Vec<ConsoleMessage>>;

    /// Close the browser session
    async fn close(&mut self) -> HarnessResult<()>;
}

/// Shared record of driver calls, readable after the driver has been moved
#[derive(Debug, Clone, Default)]
pub struct CallHistory {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallHistory {
    fn push(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// All calls in order
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(method))
    }

    /// Number of calls to a method
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(method)).count()
    }
}

/// In-memory driver for tests
#[derive(Debug)]
pub struct MockDriver {
    /// Current URL
    pub current_url: String,
    /// DOM elements in document order
    pub elements: Vec<ElementSnapshot>,
    /// Viewport size used for screenshots
    pub viewport: (u32, u32),
    activity: PageActivity,
    console_on_load: Vec<ConsoleMessage>,
    screenshot_override: Option<Screenshot>,
    failing: HashSet<String>,
    vanish_before: HashSet<String>,
    vanish_after: HashSet<String>,
    capturing: bool,
    captured: Vec<ConsoleMessage>,
    pointer: Option<Point>,
    pointer_down: bool,
    history: CallHistory,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            current_url: String::new(),
            elements: Vec::new(),
            viewport: (320, 240),
            activity: PageActivity::complete(crate::wait::NETWORK_IDLE_THRESHOLD_MS),
            console_on_load: Vec::new(),
            screenshot_override: None,
            failing: HashSet::new(),
            vanish_before: HashSet::new(),
            vanish_after: HashSet::new(),
            capturing: false,
            captured: Vec::new(),
            pointer: None,
            pointer_down: false,
            history: CallHistory::default(),
        }
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock driver with a DOM
    #[must_use]
    pub fn with_elements(elements: Vec<ElementSnapshot>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }

    /// Add a mock element
    pub fn add_element(&mut self, element: ElementSnapshot) {
        self.elements.push(element);
    }

    /// Remove every element the predicate selects
    pub fn remove_elements(&mut self, predicate: impl Fn(&ElementSnapshot) -> bool) {
        self.elements.retain(|e| !predicate(e));
    }

    /// Set the page activity reported to load-state waits
    pub fn set_activity(&mut self, activity: PageActivity) {
        self.activity = activity;
    }

    /// Console messages emitted on every navigate/reload
    pub fn set_console_on_load(&mut self, messages: Vec<ConsoleMessage>) {
        self.console_on_load = messages;
    }

    /// Return this screenshot instead of rendering one
    pub fn set_screenshot(&mut self, screenshot: Screenshot) {
        self.screenshot_override = Some(screenshot);
    }

    /// Make every call to `method` fail with a session fault
    pub fn fail_on(&mut self, method: &str) {
        self.failing.insert(method.to_string());
    }

    /// The next `scroll_into_view` or `set_value` call finds its target
    /// already removed from the DOM
    pub fn vanish_on(&mut self, method: &str) {
        self.vanish_before.insert(method.to_string());
    }

    /// The next `scroll_into_view` or `set_value` call succeeds, then its
    /// target is removed from the DOM
    pub fn vanish_after(&mut self, method: &str) {
        self.vanish_after.insert(method.to_string());
    }

    /// Shared call history handle
    #[must_use]
    pub fn history(&self) -> CallHistory {
        self.history.clone()
    }

    /// Whether console capture is active
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Whether the primary button is currently held
    #[must_use]
    pub const fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    /// Last pointer position
    #[must_use]
    pub const fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    fn record(&self, call: String, method: &str) -> HarnessResult<()> {
        self.history.push(call);
        if self.failing.contains(method) {
            return Err(HarnessError::session(format!("mock failure in {method}")));
        }
        Ok(())
    }

    fn emit_load_console(&mut self) {
        if self.capturing {
            self.captured.extend(self.console_on_load.iter().cloned());
        }
    }

    fn vanish(&mut self, locator: &Locator, index: usize) {
        let position = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| locator.matches_structure(e))
            .nth(index)
            .map(|(i, _)| i);
        if let Some(i) = position {
            self.elements.remove(i);
        }
    }

    fn structural_matches(&self, locator: &Locator) -> Vec<ElementSnapshot> {
        self.elements
            .iter()
            .filter(|e| locator.matches_structure(e))
            .enumerate()
            .map(|(index, e)| ElementSnapshot {
                index,
                ..e.clone()
            })
            .collect()
    }

    fn page_height(&self) -> u32 {
        let bottom = self
            .elements
            .iter()
            .filter_map(|e| e.bounding_box)
            .map(|b| (b.y + b.height).ceil() as u32)
            .max()
            .unwrap_or(0);
        bottom.max(self.viewport.1)
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        self.record(format!("navigate:{url}"), "navigate")?;
        self.current_url = url.to_string();
        self.emit_load_console();
        Ok(())
    }

    async fn reload(&mut self) -> HarnessResult<()> {
        self.record("reload".to_string(), "reload")?;
        self.emit_load_console();
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.current_url.clone())
    }

    async fn page_activity(&self) -> HarnessResult<PageActivity> {
        self.record("page_activity".to_string(), "page_activity")?;
        Ok(self.activity.clone())
    }

    async fn query_all(&self, locator: &Locator) -> HarnessResult<Vec<ElementSnapshot>> {
        self.record(format!("query_all:{locator}"), "query_all")?;
        Ok(self.structural_matches(locator))
    }

    async fn scroll_into_view(&mut self, locator: &Locator, index: usize) -> HarnessResult<bool> {
        self.record(format!("scroll_into_view:{locator}#{index}"), "scroll_into_view")?;
        if self.vanish_before.remove("scroll_into_view") {
            self.vanish(locator, index);
        }
        let present = index < self.structural_matches(locator).len();
        if self.vanish_after.remove("scroll_into_view") {
            self.vanish(locator, index);
        }
        Ok(present)
    }

    async fn mouse_move(&mut self, point: Point) -> HarnessResult<()> {
        self.record(format!("mouse_move:{},{}", point.x, point.y), "mouse_move")?;
        self.pointer = Some(point);
        Ok(())
    }

    async fn mouse_down(&mut self, point: Point) -> HarnessResult<()> {
        self.record(format!("mouse_down:{},{}", point.x, point.y), "mouse_down")?;
        self.pointer = Some(point);
        self.pointer_down = true;
        Ok(())
    }

    async fn mouse_up(&mut self, point: Point) -> HarnessResult<()> {
        self.record(format!("mouse_up:{},{}", point.x, point.y), "mouse_up")?;
        self.pointer = Some(point);
        self.pointer_down = false;
        Ok(())
    }

    async fn set_value(
        &mut self,
        locator: &Locator,
        index: usize,
        value: &str,
    ) -> HarnessResult<bool> {
        self.record(format!("set_value:{locator}#{index}={value}"), "set_value")?;
        if self.vanish_before.remove("set_value") {
            self.vanish(locator, index);
        }
        let target = self
            .elements
            .iter_mut()
            .filter(|e| locator.matches_structure(e))
            .nth(index);
        let applied = match target {
            Some(element) => {
                element
                    .attributes
                    .insert("value".to_string(), value.to_string());
                true
            }
            None => false,
        };
        if self.vanish_after.remove("set_value") {
            self.vanish(locator, index);
        }
        Ok(applied)
    }

    async fn screenshot(&self, full_page: bool) -> HarnessResult<Screenshot> {
        self.record(format!("screenshot:full_page={full_page}"), "screenshot")?;
        if let Some(screenshot) = &self.screenshot_override {
            return Ok(screenshot.clone());
        }
        let (width, viewport_height) = self.viewport;
        let height = if full_page {
            self.page_height()
        } else {
            viewport_height
        };
        let data = solid_png(width, height, [24, 24, 32, 255])?;
        Ok(Screenshot::new(data, width, height))
    }

    async fn start_console_capture(&mut self) -> HarnessResult<()> {
        self.record("start_console_capture".to_string(), "start_console_capture")?;
        self.captured.clear();
        self.capturing = true;
        Ok(())
    }

    async fn stop_console_capture(&mut self) -> HarnessResult<Vec<ConsoleMessage>> {
        self.capturing = false;
        self.record("stop_console_capture".to_string(), "stop_console_capture")?;
        Ok(std::mem::take(&mut self.captured))
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.record("close".to_string(), "close")
    }
}
