use crate::core::{BrowserTrait, SessionConfig};
use crate::dom::extract::{AccountExtractor, ExtractionRules};
use crate::errors::AcquisitionError;
use crate::types::{Account, Transaction};
use crate::utils::DiagnosticsCollector;
use tracing::{field, info, info_span, warn, Instrument, Span};

use super::login::{AuthFailure, AuthSequencer, LoginSelectors};
use super::session::{BrowserSession, SessionBudget};

/// Runs one complete acquisition: open a browser, log in, let the page
/// settle, read it, and tear everything down again.
///
/// Each call owns its browser for its whole duration. Nothing is shared
/// between calls, so independent acquisitions may run concurrently.
pub struct AccountAcquisition {
    selectors: LoginSelectors,
    extractor: AccountExtractor,
}

impl AccountAcquisition {
    pub fn new(selectors: LoginSelectors, rules: ExtractionRules) -> Self {
        Self {
            selectors,
            extractor: AccountExtractor::new(rules),
        }
    }

    /// All-or-nothing: either every account found on the post-login page, or
    /// one classified error. An empty list is a valid result.
    ///
    /// Teardown runs on every return path. If the returned future is dropped
    /// early, dropping the session releases the browser.
    pub async fn acquire_accounts<B: BrowserTrait>(
        &self,
        browser: B,
        config: &SessionConfig,
    ) -> Result<Vec<Account>, AcquisitionError> {
        let span = info_span!(
            "acquire_accounts",
            base_url = %config.base_url,
            session_id = field::Empty
        );

        async move {
            let budget = SessionBudget::start(config.timeout);
            let timed_out = || AcquisitionError::Timeout {
                budget: budget.total(),
            };

            let opened = tokio::time::timeout(
                budget.remaining(),
                BrowserSession::open(browser, &config.browser, budget),
            )
            .await;

            let mut session = match opened {
                Ok(Ok(session)) => session,
                Ok(Err(err)) => {
                    warn!(error = %err, "Browser could not be started; no page to snapshot");
                    return Err(AcquisitionError::TransientUnavailable(err.to_string()));
                }
                Err(_) => {
                    warn!("Session budget spent while starting the browser");
                    return Err(timed_out());
                }
            };
            Span::current().record("session_id", session.session_id());

            let outcome = match tokio::time::timeout(budget.remaining(), self.run(&session, config))
                .await
            {
                Ok(Ok(accounts)) => Ok(accounts),
                Ok(Err(_)) if budget.is_exhausted() => Err(timed_out()),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(timed_out()),
            };

            if let Err(err) = &outcome {
                warn!(error = %err, code = err.code(), "Account acquisition failed");
                if err.wants_diagnostics() {
                    DiagnosticsCollector::new(&config.diagnostics_dir)
                        .capture(&session, &err.diagnostics_tag())
                        .await;
                }
            }

            if let Err(err) = session.close().await {
                warn!(error = %err, "Browser teardown reported an error");
            }

            if let Ok(accounts) = &outcome {
                info!(count = accounts.len(), "Account acquisition finished");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        config: &SessionConfig,
    ) -> Result<Vec<Account>, AcquisitionError> {
        info!("Starting login");

        AuthSequencer::new(&self.selectors, &config.timings)
            .run(session, &config.base_url, &config.credentials)
            .await
            .map_err(classify_auth_failure)?;

        let readiness = session
            .wait_for_document_ready(config.timings.ready_timeout)
            .await?;
        if !readiness.ready {
            warn!(
                url = %readiness.url,
                waited_ms = readiness.duration_ms,
                "Post-login page never reported ready; relying on settle interval"
            );
        }
        session.pause(config.timings.settle_interval).await;

        let page = session.outer_html("html").await?;
        Ok(self.extractor.extract_accounts(&page))
    }

    /// Transaction scraping needs a second navigation sequence that does not
    /// exist yet, so this always yields an empty list.
    pub async fn fetch_transactions(
        &self,
        _config: &SessionConfig,
        account_id: &str,
    ) -> Result<Vec<Transaction>, AcquisitionError> {
        info!(account_id = %account_id, "Transaction scraping not available; returning none");
        Ok(Vec::new())
    }
}

impl Default for AccountAcquisition {
    fn default() -> Self {
        Self::new(LoginSelectors::default(), ExtractionRules::default())
    }
}

fn classify_auth_failure(failure: AuthFailure) -> AcquisitionError {
    if failure.is_authentication() {
        AcquisitionError::AuthenticationFailed {
            role: failure
                .role()
                .map(|role| role.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            reason: failure.to_string(),
        }
    } else {
        AcquisitionError::TransientUnavailable(failure.to_string())
    }
}
