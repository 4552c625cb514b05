//! Chromium capability provider over the Chrome `DevTools` Protocol.
//!
//! DOM reads go through small page-side scripts that return serialisable
//! snapshots; pointer input goes through `Input.dispatchMouseEvent`; console
//! output is collected from `Runtime.consoleAPICalled` and `Log.entryAdded`
//! events (the latter carries browser-side errors such as failed resource
//! loads).

use crate::diagnostics::{ConsoleMessage, ConsoleSeverity};
use crate::driver::{Driver, DriverConfig, Screenshot};
use crate::locator::{ElementSnapshot, Locator, Point};
use crate::result::{HarnessError, HarnessResult};
use crate::wait::PageActivity;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::log::{EventEntryAdded, LogEntry, LogEntrySource};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page as CdpPage, ScreenshotParams};
use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type ConsoleBuffer = Arc<StdMutex<Vec<ConsoleMessage>>>;

fn cdp_err(context: &str, e: impl std::fmt::Display) -> HarnessError {
    HarnessError::session(format!("{context}: {e}"))
}

fn js_string(s: &str) -> HarnessResult<String> {
    Ok(serde_json::to_string(s)?)
}

fn snapshot_script(css: &str) -> HarnessResult<String> {
    Ok(format!(
        r"(() => {{
  const nodes = Array.from(document.querySelectorAll({css}));
  return nodes.map((el, index) => {{
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const visible = rect.width > 0 && rect.height > 0
      && style.visibility !== 'hidden' && style.display !== 'none';
    const attributes = {{}};
    for (const attr of el.attributes) attributes[attr.name] = attr.value;
    if (typeof el.value === 'string') attributes.value = el.value;
    return {{
      index,
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.textContent || '').trim(),
      attributes,
      visible,
      boundingBox: visible
        ? {{ x: rect.x, y: rect.y, width: rect.width, height: rect.height }}
        : null,
    }};
  }});
}})()",
        css = js_string(css)?
    ))
}

fn nth_element_script(css: &str, index: usize, body: &str) -> HarnessResult<String> {
    Ok(format!(
        r"(() => {{
  const el = document.querySelectorAll({css})[{index}];
  if (!el) return false;
  {body}
  return true;
}})()",
        css = js_string(css)?
    ))
}

// Resource timing only sees finished requests, so in-flight fetches do not
// reset the idle clock until they complete.
const ACTIVITY_SCRIPT: &str = r"(() => {
  const entries = performance.getEntriesByType('resource');
  const lastEnd = entries.reduce((m, e) => Math.max(m, e.responseEnd), 0);
  return {
    readyState: document.readyState,
    idleForMs: Math.max(0, Math.floor(performance.now() - lastEnd)),
  };
})()";

/// Running console subscription
#[derive(Debug)]
struct ConsoleCapture {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Real browser session over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Arc<Mutex<CdpBrowser>>,
    page: CdpPage,
    handler: JoinHandle<()>,
    console_buffer: ConsoleBuffer,
    console: Option<ConsoleCapture>,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page
    ///
    /// # Errors
    ///
    /// Returns a session fault if the browser cannot be launched
    pub async fn launch(config: DriverConfig) -> HarnessResult<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            });

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| cdp_err("invalid browser configuration", e))?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| cdp_err("failed to launch browser", e))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| cdp_err("failed to open page", e))?;

        info!(headless = config.headless, "browser launched");
        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            page,
            handler,
            console_buffer: Arc::new(StdMutex::new(Vec::new())),
            console: None,
        })
    }

    /// The configuration this browser was launched with
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    async fn eval<T: DeserializeOwned>(&self, script: &str) -> HarnessResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| cdp_err("script evaluation failed", e))?;
        result
            .into_value()
            .map_err(|e| cdp_err("unexpected script result", e))
    }

    async fn dispatch_mouse(
        &self,
        kind: DispatchMouseEventType,
        point: Point,
        with_button: bool,
    ) -> HarnessResult<()> {
        let mut params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(point.x)
            .y(point.y);
        if with_button {
            params = params.button(MouseButton::Left).click_count(1);
        }
        let params = params
            .build()
            .map_err(|e| cdp_err("invalid mouse event", e))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| cdp_err("mouse event failed", e))?;
        Ok(())
    }
}

fn console_text(event: &EventConsoleApiCalled) -> String {
    event
        .args
        .iter()
        .map(|arg| match (&arg.value, &arg.description) {
            (Some(serde_json::Value::String(s)), _) => s.clone(),
            (Some(value), _) => value.to_string(),
            (None, Some(description)) => description.clone(),
            (None, None) => String::new(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Browser-side log entry as a console message; worker entries are skipped
fn log_entry_message(entry: &LogEntry) -> Option<ConsoleMessage> {
    if matches!(entry.source, LogEntrySource::Worker) {
        return None;
    }
    Some(ConsoleMessage::new(
        ConsoleSeverity::parse(entry.level.as_ref()),
        entry.text.clone(),
    ))
}

fn push_message(buffer: &ConsoleBuffer, message: ConsoleMessage) {
    buffer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(message);
}

/// Move messages into `buffer` in arrival order until `stop` fires, then take
/// whatever is already queued without waiting for more.
async fn drain_console(
    mut events: BoxStream<'static, ConsoleMessage>,
    mut stop: oneshot::Receiver<()>,
    buffer: ConsoleBuffer,
) {
    loop {
        tokio::select! {
            biased;
            event = events.next() => match event {
                Some(message) => push_message(&buffer, message),
                None => return,
            },
            _ = &mut stop => break,
        }
    }
    while let Some(Some(message)) = events.next().now_or_never() {
        push_message(&buffer, message);
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        debug!(url, "navigating");
        tokio::time::timeout(self.config.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| HarnessError::Timeout {
                what: format!("navigation to {url}"),
                ms: self.config.navigation_timeout.as_millis() as u64,
            })?
            .map_err(|e| cdp_err(&format!("navigation to {url} failed"), e))?;
        Ok(())
    }

    async fn reload(&mut self) -> HarnessResult<()> {
        tokio::time::timeout(self.config.navigation_timeout, self.page.reload())
            .await
            .map_err(|_| HarnessError::Timeout {
                what: "page reload".to_string(),
                ms: self.config.navigation_timeout.as_millis() as u64,
            })?
            .map_err(|e| cdp_err("reload failed", e))?;
        Ok(())
    }

    async fn current_url(&self) -> HarnessResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| cdp_err("failed to read URL", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn page_activity(&self) -> HarnessResult<PageActivity> {
        self.eval(ACTIVITY_SCRIPT).await
    }

    async fn query_all(&self, locator: &Locator) -> HarnessResult<Vec<ElementSnapshot>> {
        self.eval(&snapshot_script(&locator.to_css())?).await
    }

    async fn scroll_into_view(&mut self, locator: &Locator, index: usize) -> HarnessResult<bool> {
        let script = nth_element_script(
            &locator.to_css(),
            index,
            "el.scrollIntoView({ block: 'center', inline: 'center' });",
        )?;
        self.eval(&script).await
    }

    async fn mouse_move(&mut self, point: Point) -> HarnessResult<()> {
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, point, false)
            .await
    }

    async fn mouse_down(&mut self, point: Point) -> HarnessResult<()> {
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, point, true)
            .await
    }

    async fn mouse_up(&mut self, point: Point) -> HarnessResult<()> {
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, point, true)
            .await
    }

    async fn set_value(
        &mut self,
        locator: &Locator,
        index: usize,
        value: &str,
    ) -> HarnessResult<bool> {
        let body = format!(
            r"const value = {value};
  const desc = Object.getOwnPropertyDescriptor(Object.getPrototypeOf(el), 'value');
  if (desc && desc.set) desc.set.call(el, value); else el.value = value;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));",
            value = js_string(value)?
        );
        let script = nth_element_script(&locator.to_css(), index, &body)?;
        self.eval(&script).await
    }

    async fn screenshot(&self, full_page: bool) -> HarnessResult<Screenshot> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        let data = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| cdp_err("screenshot failed", e))?;
        let (width, height) = image::load_from_memory(&data)
            .map(|img| (img.width(), img.height()))
            .unwrap_or((0, 0));
        Ok(Screenshot::new(data, width, height))
    }

    async fn start_console_capture(&mut self) -> HarnessResult<()> {
        if let Some(capture) = self.console.take() {
            capture.task.abort();
        }
        self.console_buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let api_calls = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| cdp_err("console subscription failed", e))?
            .map(|event| {
                ConsoleMessage::new(
                    ConsoleSeverity::parse(event.r#type.as_ref()),
                    console_text(&event),
                )
            });
        let log_entries = self
            .page
            .event_listener::<EventEntryAdded>()
            .await
            .map_err(|e| cdp_err("log subscription failed", e))?
            .filter_map(|event| future::ready(log_entry_message(&event.entry)));

        let (stop, stopped) = oneshot::channel();
        let events = stream::select(api_calls, log_entries).boxed();
        let task = tokio::spawn(drain_console(
            events,
            stopped,
            Arc::clone(&self.console_buffer),
        ));
        self.console = Some(ConsoleCapture { stop, task });
        Ok(())
    }

    async fn stop_console_capture(&mut self) -> HarnessResult<Vec<ConsoleMessage>> {
        if let Some(capture) = self.console.take() {
            // an Err means the stream already ended and the task is done
            let _ = capture.stop.send(());
            if let Err(e) = capture.task.await {
                warn!(error = %e, "console collector ended abnormally");
            }
        }
        let messages = std::mem::take(
            &mut *self
                .console_buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        Ok(messages)
    }

    async fn close(&mut self) -> HarnessResult<()> {
        if let Some(capture) = self.console.take() {
            capture.task.abort();
        }
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            self.handler.abort();
            if let Some(Err(kill_err)) = browser.kill().await {
                warn!(error = %kill_err, "failed to kill browser process");
            }
            return Err(cdp_err("failed to close browser", e));
        }
        match browser.wait().await {
            Ok(status) => debug!(?status, "browser process exited"),
            Err(e) => warn!(error = %e, "failed to wait for browser exit"),
        }
        self.handler.abort();
        info!("browser closed");
        Ok(())
    }
}
