use crate::core::BrowserTrait;
use std::time::{Duration, Instant};
use tracing::debug;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct JavaScriptRunner;

impl JavaScriptRunner {
    /// Polls a boolean expression until it is true or `timeout` elapses.
    /// The expression is evaluated at least once. A failed evaluation counts
    /// as false: the execution context is torn down while a page navigates.
    pub async fn wait_for_condition<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        condition: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> bool {
        let start_time = Instant::now();

        loop {
            match browser.execute_script(tab, condition).await {
                Ok(result) if result.as_bool().unwrap_or(false) => return true,
                Ok(_) => {}
                Err(err) => debug!(error = %err, "Condition evaluation failed; polling again"),
            }

            if start_time.elapsed() >= timeout {
                return false;
            }

            tokio::time::sleep(poll_interval.min(timeout.saturating_sub(start_time.elapsed())))
                .await;
        }
    }

    /// Expression that is true once `selector` matches an element that is
    /// rendered with a non-empty box. Invalid selectors evaluate to false.
    pub fn visibility_script(selector: &str) -> String {
        let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
        format!(
            r#"
            (function() {{
                try {{
                    const element = document.querySelector({});
                    if (!element) return false;
                    const style = window.getComputedStyle(element);
                    if (style.display === 'none' || style.visibility === 'hidden') return false;
                    const rect = element.getBoundingClientRect();
                    return rect.width > 0 && rect.height > 0;
                }} catch (e) {{
                    return false;
                }}
            }})()
            "#,
            quoted
        )
    }

    pub fn document_ready() -> &'static str {
        "document.readyState === 'complete'"
    }

    /// Clears every input value on the page.
    pub fn scrub_inputs() -> &'static str {
        r#"
            (function() {
                let cleared = 0;
                document.querySelectorAll('input, textarea').forEach(element => {
                    if (element.value) {
                        element.value = '';
                        cleared++;
                    }
                });
                return cleared;
            })()
        "#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BrowserConfig;
    use crate::testing::ScriptedBrowser;

    #[test]
    fn test_visibility_script_escapes_selector() {
        let script = JavaScriptRunner::visibility_script(r#"a[title*="Login"]"#);
        assert!(script.contains(r#"document.querySelector("a[title*=\"Login\"]")"#));
    }

    #[tokio::test]
    async fn test_failed_evaluation_counts_as_not_yet() {
        let mut browser = ScriptedBrowser::new().failing_ready_check();
        browser.launch(&BrowserConfig::default()).await.unwrap();

        let ready = JavaScriptRunner::wait_for_condition(
            &browser,
            &(),
            JavaScriptRunner::document_ready(),
            Duration::from_millis(30),
            Duration::from_millis(10),
        )
        .await;

        assert!(!ready);
    }

    #[tokio::test]
    async fn test_condition_met_on_first_evaluation() {
        let mut browser = ScriptedBrowser::new();
        browser.launch(&BrowserConfig::default()).await.unwrap();

        assert!(
            JavaScriptRunner::wait_for_condition(
                &browser,
                &(),
                JavaScriptRunner::document_ready(),
                Duration::ZERO,
                POLL_INTERVAL,
            )
            .await
        );
    }
}
