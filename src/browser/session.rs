use crate::core::{BrowserConfig, BrowserTrait};
use crate::errors::{BrowserAgentError, Result};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::navigation::{NavigationManager, NavigationResult};

/// Wall-clock allowance for one acquisition.
#[derive(Debug, Clone, Copy)]
pub struct SessionBudget {
    started: Instant,
    total: Duration,
}

impl SessionBudget {
    pub fn start(total: Duration) -> Self {
        Self {
            started: Instant::now(),
            total,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.started.elapsed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Shortens `wait` so it never runs past the end of the budget.
    pub fn clamp(&self, wait: Duration) -> Duration {
        wait.min(self.remaining())
    }
}

/// One launched browser with one tab, bound to a budget.
///
/// `close` is idempotent. If the session is dropped without `close` (the
/// caller's future was cancelled) the browser's own drop releases the
/// process.
pub struct BrowserSession<B: BrowserTrait> {
    browser: B,
    tab: Option<B::TabHandle>,
    session_id: String,
    budget: SessionBudget,
}

impl<B: BrowserTrait> BrowserSession<B> {
    /// Launches the browser and opens a tab. On failure the browser is
    /// closed before the error is returned.
    pub async fn open(mut browser: B, config: &BrowserConfig, budget: SessionBudget) -> Result<Self> {
        let session_id = uuid::Uuid::new_v4().to_string();

        if let Err(err) = browser.launch(config).await {
            Self::release(&mut browser, &session_id).await;
            return Err(err);
        }

        let tab = match browser.new_tab().await {
            Ok(tab) => tab,
            Err(err) => {
                Self::release(&mut browser, &session_id).await;
                return Err(err);
            }
        };

        info!(session_id = %session_id, headless = config.headless, "Browser session opened");

        Ok(Self {
            browser,
            tab: Some(tab),
            session_id,
            budget,
        })
    }

    async fn release(browser: &mut B, session_id: &str) {
        if let Err(err) = browser.close().await {
            warn!(session_id = %session_id, error = %err, "Browser teardown failed");
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn budget(&self) -> &SessionBudget {
        &self.budget
    }

    pub fn is_open(&self) -> bool {
        self.tab.is_some() && self.browser.is_running()
    }

    fn tab(&self) -> Result<&B::TabHandle> {
        self.tab.as_ref().ok_or(BrowserAgentError::NoActiveTab)
    }

    pub async fn navigate(&self, url: &str) -> Result<()> {
        debug!(session_id = %self.session_id, url = %url, "Navigating");
        self.browser.navigate(self.tab()?, url).await
    }

    /// Visibility check, shortened to whatever is left of the budget.
    pub async fn wait_until_visible(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let timeout = self.budget.clamp(timeout);
        self.browser
            .wait_until_visible(self.tab()?, selector, timeout)
            .await
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        self.browser.click(self.tab()?, selector).await
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.browser.type_text(self.tab()?, selector, text).await
    }

    pub async fn outer_html(&self, selector: &str) -> Result<String> {
        self.browser.outer_html(self.tab()?, selector).await
    }

    pub async fn execute_script(&self, script: &str) -> Result<Value> {
        self.browser.execute_script(self.tab()?, script).await
    }

    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.browser.take_screenshot(self.tab()?).await
    }

    pub async fn wait_for_document_ready(&self, timeout: Duration) -> Result<NavigationResult> {
        Ok(NavigationManager::wait_for_document_ready(
            &self.browser,
            self.tab()?,
            self.budget.clamp(timeout),
        )
        .await)
    }

    /// Fixed pause, never longer than the remaining budget.
    pub async fn pause(&self, wait: Duration) {
        let wait = self.budget.clamp(wait);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        if self.tab.take().is_none() && !self.browser.is_running() {
            return Ok(());
        }

        let result = self.browser.close().await;
        info!(session_id = %self.session_id, "Browser session closed");
        result
    }
}
