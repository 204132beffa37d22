use crate::browser::{AccountAcquisition, ChromeBrowser};
use crate::core::{BrowserTrait, SessionConfig};
use crate::errors::AcquisitionError;
use crate::types::{Account, Transaction};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Instrument};

use super::{AccountProvider, RequestContext};

/// Chrome is told to stay alive at least this long past the session budget,
/// so it is never reaped while the budget is still running.
const IDLE_MARGIN: Duration = Duration::from_secs(30);

type BrowserFactory<B> = Box<dyn Fn() -> B + Send + Sync>;

/// Live provider. Every call builds a fresh browser from the factory and
/// runs one [`AccountAcquisition`] with it.
pub struct ScrapingProvider<B: BrowserTrait = ChromeBrowser> {
    config: Arc<SessionConfig>,
    acquisition: AccountAcquisition,
    factory: BrowserFactory<B>,
}

impl ScrapingProvider<ChromeBrowser> {
    pub fn new(config: Arc<SessionConfig>) -> Self {
        let idle_timeout = config.timeout + IDLE_MARGIN;
        Self::with_factory(config, move || {
            ChromeBrowser::new().with_idle_timeout(idle_timeout)
        })
    }
}

impl<B: BrowserTrait + 'static> ScrapingProvider<B> {
    pub fn with_factory<F>(config: Arc<SessionConfig>, factory: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
    {
        Self {
            config,
            acquisition: AccountAcquisition::default(),
            factory: Box::new(factory),
        }
    }
}

#[async_trait]
impl<B: BrowserTrait + 'static> AccountProvider for ScrapingProvider<B> {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>, AcquisitionError> {
        let span = info_span!("list_accounts", request_id = %ctx.request_id);

        async {
            let mut accounts = self
                .acquisition
                .acquire_accounts((self.factory)(), &self.config)
                .await?;

            let now = Utc::now();
            for account in &mut accounts {
                account.touch(now);
            }

            info!(count = accounts.len(), "Accounts retrieved");
            Ok(accounts)
        }
        .instrument(span)
        .await
    }

    async fn fetch_account_with_transactions(
        &self,
        ctx: &RequestContext,
        account_id: &str,
    ) -> Result<(Account, Vec<Transaction>), AcquisitionError> {
        let mut account = self
            .list_accounts(ctx)
            .await?
            .into_iter()
            .find(|account| account.id == account_id)
            .ok_or_else(|| AcquisitionError::AccountNotFound(account_id.to_string()))?;

        let transactions = self
            .acquisition
            .fetch_transactions(&self.config, account_id)
            .await?;
        account.touch(Utc::now());

        Ok((account, transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Credentials, SessionTimings};
    use crate::testing::{ScriptedBrowser, DASHBOARD_HTML};
    use tokio_test::assert_ok;

    fn provider(dir: &std::path::Path) -> ScrapingProvider<ScriptedBrowser> {
        let config = SessionConfig::new(Credentials::new("user", "secret"))
            .with_base_url("https://bank.example")
            .with_timings(SessionTimings::immediate())
            .with_diagnostics_dir(dir);

        ScrapingProvider::with_factory(Arc::new(config), || {
            ScriptedBrowser::new()
                .with_visible([
                    "body",
                    r#"a[href*="login"]"#,
                    r#"a[href*="internet-banking"]"#,
                    r#"input[name="userid"]"#,
                    r#"input[type="password"]"#,
                    r#"button[type="submit"]"#,
                ])
                .with_page(DASHBOARD_HTML)
        })
    }

    #[tokio::test]
    async fn test_listed_accounts_are_stamped() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = assert_ok!(provider(dir.path()).list_accounts(&RequestContext::new()).await);

        assert_eq!(accounts.len(), 3);
        assert!(accounts.iter().all(|a| a.last_updated.is_some()));
    }

    #[tokio::test]
    async fn test_fetch_finds_listed_account() {
        let dir = tempfile::tempdir().unwrap();
        let (account, transactions) = assert_ok!(
            provider(dir.path())
                .fetch_account_with_transactions(&RequestContext::new(), "account_1")
                .await
        );

        assert_eq!(account.name, "Complete Access Account");
        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unknown_account_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = provider(dir.path())
            .fetch_account_with_transactions(&RequestContext::new(), "doesnotexist")
            .await
            .unwrap_err();

        assert!(matches!(err, AcquisitionError::AccountNotFound(id) if id == "doesnotexist"));
    }
}
