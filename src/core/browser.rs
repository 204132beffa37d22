use crate::core::config::BrowserConfig;
use crate::errors::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// The automation capability the acquisition engine is written against.
///
/// Every locator is a CSS selector evaluated with `document.querySelector`
/// semantics. Implementations must be safe to drop at any point: dropping a
/// launched browser releases its process.
#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type TabHandle: Send + Sync;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &BrowserConfig) -> Result<()>;

    /// Create a new tab/page
    async fn new_tab(&self) -> Result<Self::TabHandle>;

    /// Navigate to a URL and wait for the navigation to finish
    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` is rendered and visible.
    /// Returns `Ok(false)` when the timeout elapses without a match.
    async fn wait_until_visible(
        &self,
        tab: &Self::TabHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool>;

    /// Activate (click) the first element matching `selector`
    async fn click(&self, tab: &Self::TabHandle, selector: &str) -> Result<()>;

    /// Type raw text into the first element matching `selector`
    async fn type_text(&self, tab: &Self::TabHandle, selector: &str, text: &str) -> Result<()>;

    /// Outer HTML of the first element matching `selector`
    async fn outer_html(&self, tab: &Self::TabHandle, selector: &str) -> Result<String>;

    /// Execute JavaScript in the page
    async fn execute_script(&self, tab: &Self::TabHandle, script: &str) -> Result<Value>;

    /// Take a full viewport PNG screenshot
    async fn take_screenshot(&self, tab: &Self::TabHandle) -> Result<Vec<u8>>;

    /// Get current URL
    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String>;

    /// Check if browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser
    async fn close(&mut self) -> Result<()>;
}
