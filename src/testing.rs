//! In-memory browser used by the test suite and by offline demos.
//!
//! `ScriptedBrowser` answers visibility checks from a fixed set of
//! selectors, serves one page of markup, and records everything the engine
//! asks it to do so tests can assert on check order, typed values,
//! screenshots and teardown.

use crate::core::{BrowserConfig, BrowserTrait};
use crate::errors::{BrowserAgentError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A rendered post-login page with three accounts.
pub const DASHBOARD_HTML: &str = r#"<html>
<head><title>Internet Banking</title><script>var promo = "$9,999.99";</script></head>
<body>
  <div class="account">
    <h3>Complete Access Account</h3>
    <span class="number">BSB 084-001 ****5678</span>
    <span class="balance">$2,543.67</span>
  </div>
  <div class="account">
    <h3>NAB Reward Saver</h3>
    <span class="number">****3344</span>
    <span class="balance">$15,420.89</span>
  </div>
  <div class="account">
    <h3>Low Rate Credit Card</h3>
    <span class="balance">-$847.23</span>
  </div>
</body>
</html>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserAction {
    Navigate(String),
    Click(String),
    Type { selector: String, text: String },
    ScrubInputs,
    Screenshot,
}

/// Shared view of what a `ScriptedBrowser` has been asked to do. Stays
/// readable after the browser itself has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    checked: Arc<Mutex<Vec<String>>>,
    actions: Arc<Mutex<Vec<BrowserAction>>>,
    live: Arc<AtomicUsize>,
    launches: Arc<AtomicUsize>,
}

impl Recorder {
    /// Selectors checked for visibility, in order.
    pub fn checked(&self) -> Vec<String> {
        self.checked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn actions(&self) -> Vec<BrowserAction> {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn screenshots(&self) -> usize {
        self.actions()
            .iter()
            .filter(|a| **a == BrowserAction::Screenshot)
            .count()
    }

    /// Browsers launched and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn record_check(&self, selector: &str) {
        self.checked
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(selector.to_string());
    }

    fn act(&self, action: BrowserAction) {
        self.actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action);
    }
}

pub struct ScriptedBrowser {
    visible: HashSet<String>,
    failing_clicks: HashSet<String>,
    failing_checks: HashSet<String>,
    page_html: String,
    latency: Duration,
    fail_launch: bool,
    fail_navigation: bool,
    fail_screenshot: bool,
    document_ready: bool,
    fail_ready_check: bool,
    launched: bool,
    recorder: Recorder,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self {
            visible: HashSet::new(),
            failing_clicks: HashSet::new(),
            failing_checks: HashSet::new(),
            page_html: "<html><body></body></html>".to_string(),
            latency: Duration::ZERO,
            fail_launch: false,
            fail_navigation: false,
            fail_screenshot: false,
            document_ready: true,
            fail_ready_check: false,
            launched: false,
            recorder: Recorder::default(),
        }
    }

    /// Every selector in `selectors` resolves as visible.
    pub fn with_visible<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn with_page(mut self, html: impl Into<String>) -> Self {
        self.page_html = html.into();
        self
    }

    /// Delay applied to navigation and every successful visibility check.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing_click(mut self, selector: impl Into<String>) -> Self {
        self.failing_clicks.insert(selector.into());
        self
    }

    /// Visibility checks for `selector` error, as they do while the page's
    /// execution context is being replaced.
    pub fn failing_visibility_check(mut self, selector: impl Into<String>) -> Self {
        self.failing_checks.insert(selector.into());
        self
    }

    pub fn fail_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn fail_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn fail_screenshot(mut self) -> Self {
        self.fail_screenshot = true;
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.document_ready = false;
        self
    }

    /// `document.readyState` evaluation errors instead of answering.
    pub fn failing_ready_check(mut self) -> Self {
        self.fail_ready_check = true;
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    fn ensure_launched(&self) -> Result<()> {
        if self.launched {
            Ok(())
        } else {
            Err(BrowserAgentError::BrowserNotLaunched)
        }
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn release(&mut self) {
        if self.launched {
            self.launched = false;
            self.recorder.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Default for ScriptedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScriptedBrowser {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl BrowserTrait for ScriptedBrowser {
    type TabHandle = ();

    async fn launch(&mut self, _config: &BrowserConfig) -> Result<()> {
        if self.fail_launch {
            return Err(BrowserAgentError::LaunchFailed(
                "chrome executable not found".to_string(),
            ));
        }
        self.launched = true;
        self.recorder.live.fetch_add(1, Ordering::SeqCst);
        self.recorder.launches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        self.ensure_launched()
    }

    async fn navigate(&self, _tab: &Self::TabHandle, url: &str) -> Result<()> {
        self.ensure_launched()?;
        self.recorder.act(BrowserAction::Navigate(url.to_string()));
        self.delay().await;
        if self.fail_navigation {
            return Err(BrowserAgentError::NavigationFailed(format!(
                "net::ERR_NAME_NOT_RESOLVED at {}",
                url
            )));
        }
        Ok(())
    }

    async fn wait_until_visible(
        &self,
        _tab: &Self::TabHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool> {
        self.ensure_launched()?;
        self.recorder.record_check(selector);
        if self.failing_checks.contains(selector) {
            return Err(BrowserAgentError::JavaScriptFailed(
                "Cannot find context with specified id".to_string(),
            ));
        }
        if self.visible.contains(selector) {
            self.delay().await;
            Ok(true)
        } else {
            tokio::time::sleep(timeout).await;
            Ok(false)
        }
    }

    async fn click(&self, _tab: &Self::TabHandle, selector: &str) -> Result<()> {
        self.ensure_launched()?;
        if !self.visible.contains(selector) {
            return Err(BrowserAgentError::ElementNotFound(selector.to_string()));
        }
        if self.failing_clicks.contains(selector) {
            return Err(BrowserAgentError::InteractionFailed(format!(
                "click {}: node is detached",
                selector
            )));
        }
        self.recorder.act(BrowserAction::Click(selector.to_string()));
        Ok(())
    }

    async fn type_text(&self, _tab: &Self::TabHandle, selector: &str, text: &str) -> Result<()> {
        self.ensure_launched()?;
        if !self.visible.contains(selector) {
            return Err(BrowserAgentError::ElementNotFound(selector.to_string()));
        }
        self.recorder.act(BrowserAction::Type {
            selector: selector.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn outer_html(&self, _tab: &Self::TabHandle, _selector: &str) -> Result<String> {
        self.ensure_launched()?;
        Ok(self.page_html.clone())
    }

    async fn execute_script(&self, _tab: &Self::TabHandle, script: &str) -> Result<Value> {
        self.ensure_launched()?;
        if script.contains("readyState") {
            if self.fail_ready_check {
                return Err(BrowserAgentError::JavaScriptFailed(
                    "Execution context was destroyed".to_string(),
                ));
            }
            return Ok(Value::Bool(self.document_ready));
        }
        if script.contains("querySelectorAll('input") {
            self.recorder.act(BrowserAction::ScrubInputs);
            return Ok(Value::from(0));
        }
        Ok(Value::Null)
    }

    async fn take_screenshot(&self, _tab: &Self::TabHandle) -> Result<Vec<u8>> {
        self.ensure_launched()?;
        if self.fail_screenshot {
            return Err(BrowserAgentError::ScreenshotFailed(
                "target closed".to_string(),
            ));
        }
        self.recorder.act(BrowserAction::Screenshot);
        Ok(b"\x89PNG\r\n\x1a\nscripted".to_vec())
    }

    async fn get_url(&self, _tab: &Self::TabHandle) -> Result<String> {
        Ok("about:blank".to_string())
    }

    fn is_running(&self) -> bool {
        self.launched
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}
