//! Account sources behind one interface: the live browser scraper and a
//! fixed sample data set for development.

pub mod sample;
pub mod scraping;

use crate::core::{ProviderKind, SessionConfig};
use crate::errors::AcquisitionError;
use crate::types::{Account, Transaction};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub use sample::SampleProvider;
pub use scraping::ScrapingProvider;

/// Per-request correlation data carried into logs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
pub trait AccountProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>, AcquisitionError>;

    async fn fetch_account_with_transactions(
        &self,
        ctx: &RequestContext,
        account_id: &str,
    ) -> Result<(Account, Vec<Transaction>), AcquisitionError>;
}

pub fn build_provider(kind: ProviderKind, config: Arc<SessionConfig>) -> Box<dyn AccountProvider> {
    match kind {
        ProviderKind::Browser => Box::new(ScrapingProvider::new(config)),
        ProviderKind::Sample => Box::new(SampleProvider::new()),
    }
}
