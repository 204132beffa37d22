use crate::core::{BrowserConfig, BrowserTrait};
use crate::errors::{BrowserAgentError, Result};
use crate::utils::javascript::{JavaScriptRunner, POLL_INTERVAL};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chrome browser implementation.
///
/// `headless_chrome` is a blocking client, so every CDP round trip runs on
/// the blocking pool. That keeps the surrounding `tokio::time::timeout`
/// effective while a call is in flight.
pub struct ChromeBrowser {
    browser: Option<Browser>,
    idle_timeout: Duration,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self {
            browser: None,
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// How long the DevTools connection may stay silent before Chrome is
    /// considered gone. Should be at least the session budget.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    async fn on_tab<T, F>(tab: &Arc<Tab>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(tab);
        tokio::task::spawn_blocking(move || f(&tab)).await?
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type TabHandle = Arc<Tab>;

    async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        let config = config.clone();
        let idle_timeout = self.idle_timeout;

        let browser = tokio::task::spawn_blocking(move || -> Result<Browser> {
            let window_size_arg = format!(
                "--window-size={},{}",
                config.viewport.width, config.viewport.height
            );

            let user_agent_arg = config
                .user_agent
                .as_ref()
                .map(|ua| format!("--user-agent={}", ua));

            let mut args = vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new(&window_size_arg),
            ];

            if let Some(ref ua_arg) = user_agent_arg {
                args.push(OsStr::new(ua_arg));
            }

            for arg in &config.args {
                args.push(OsStr::new(arg));
            }

            let launch_options = LaunchOptions::default_builder()
                .headless(config.headless)
                .idle_browser_timeout(idle_timeout)
                .args(args)
                .build()
                .map_err(|e| BrowserAgentError::LaunchFailed(e.to_string()))?;

            Browser::new(launch_options).map_err(|e| BrowserAgentError::LaunchFailed(e.to_string()))
        })
        .await??;

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self
            .browser
            .clone()
            .ok_or(BrowserAgentError::BrowserNotLaunched)?;

        tokio::task::spawn_blocking(move || {
            browser
                .new_tab()
                .map_err(|e| BrowserAgentError::TabCreationFailed(e.to_string()))
        })
        .await?
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()> {
        let url = url.to_string();
        Self::on_tab(tab, move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| BrowserAgentError::NavigationFailed(e.to_string()))?;

            tab.wait_until_navigated()
                .map_err(|e| BrowserAgentError::NavigationFailed(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn wait_until_visible(
        &self,
        tab: &Self::TabHandle,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool> {
        let script = JavaScriptRunner::visibility_script(selector);
        Ok(JavaScriptRunner::wait_for_condition(self, tab, &script, timeout, POLL_INTERVAL).await)
    }

    async fn click(&self, tab: &Self::TabHandle, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        Self::on_tab(tab, move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserAgentError::ElementNotFound(format!("{}: {}", selector, e)))?;
            element
                .click()
                .map_err(|e| BrowserAgentError::InteractionFailed(format!("click {}: {}", selector, e)))?;
            debug!(selector = %selector, "Clicked element");
            Ok(())
        })
        .await
    }

    async fn type_text(&self, tab: &Self::TabHandle, selector: &str, text: &str) -> Result<()> {
        let selector = selector.to_string();
        let text = text.to_string();
        Self::on_tab(tab, move |tab| {
            let element = tab
                .find_element(&selector)
                .map_err(|e| BrowserAgentError::ElementNotFound(format!("{}: {}", selector, e)))?;
            // the typed value is deliberately left out of every message
            element
                .type_into(&text)
                .map_err(|_| BrowserAgentError::InteractionFailed(format!("type into {}", selector)))?;
            Ok(())
        })
        .await
    }

    async fn outer_html(&self, tab: &Self::TabHandle, selector: &str) -> Result<String> {
        let selector = selector.to_string();
        Self::on_tab(tab, move |tab| {
            tab.find_element(&selector)
                .map_err(|e| BrowserAgentError::ElementNotFound(format!("{}: {}", selector, e)))?
                .get_content()
                .map_err(BrowserAgentError::from_any_error)
        })
        .await
    }

    async fn execute_script(&self, tab: &Self::TabHandle, script: &str) -> Result<Value> {
        let script = script.to_string();
        Self::on_tab(tab, move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| BrowserAgentError::JavaScriptFailed(e.to_string()))?;

            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    async fn take_screenshot(&self, tab: &Self::TabHandle) -> Result<Vec<u8>> {
        Self::on_tab(tab, |tab| {
            tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
                .map_err(|e| BrowserAgentError::ScreenshotFailed(e.to_string()))
        })
        .await
    }

    async fn get_url(&self, tab: &Self::TabHandle) -> Result<String> {
        Ok(tab.get_url())
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        // dropping the handle terminates the Chrome process
        if let Some(browser) = self.browser.take() {
            tokio::task::spawn_blocking(move || drop(browser)).await?;
        }
        Ok(())
    }
}
