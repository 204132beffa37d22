use crate::core::BrowserTrait;
use crate::utils::javascript::{JavaScriptRunner, POLL_INTERVAL};
use std::time::{Duration, Instant};
use tracing::debug;

pub struct NavigationManager;

impl NavigationManager {
    /// Waits for the document to report `readyState == "complete"`.
    ///
    /// A page that never settles, or whose state cannot be read, is not an
    /// error here: the caller falls back to its fixed settle pause, so the
    /// outcome is reported rather than raised.
    pub async fn wait_for_document_ready<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        timeout: Duration,
    ) -> NavigationResult {
        let start_time = Instant::now();

        let ready = JavaScriptRunner::wait_for_condition(
            browser,
            tab,
            JavaScriptRunner::document_ready(),
            timeout,
            POLL_INTERVAL,
        )
        .await;

        let url = browser.get_url(tab).await.unwrap_or_default();
        let result = NavigationResult {
            ready,
            url,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        debug!(
            ready = result.ready,
            duration_ms = result.duration_ms,
            "Document readiness check finished"
        );

        result
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub ready: bool,
    pub url: String,
    pub duration_ms: u64,
}
