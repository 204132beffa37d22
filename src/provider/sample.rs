use crate::errors::AcquisitionError;
use crate::types::{Account, AccountType, Money, Transaction};
use async_trait::async_trait;
use chrono::{Duration, Local, Utc};
use tracing::debug;

use super::{AccountProvider, RequestContext};

/// Fixed data set for development without a browser or credentials.
#[derive(Debug, Clone, Default)]
pub struct SampleProvider;

impl SampleProvider {
    pub fn new() -> Self {
        Self
    }

    fn accounts() -> Vec<Account> {
        vec![
            Account::new(
                "12345678".to_string(),
                "Complete Access Account".to_string(),
                AccountType::Savings,
                Money::new("2543.67"),
            )
            .with_available_balance(Money::new("2543.67"))
            .with_account_number("****5678".to_string())
            .with_bsb("084001".to_string()),
            Account::new(
                "87654321".to_string(),
                "NAB Classic Banking Account".to_string(),
                AccountType::Checking,
                Money::new("847.23"),
            )
            .with_available_balance(Money::new("847.23"))
            .with_account_number("****4321".to_string())
            .with_bsb("084001".to_string()),
            Account::new(
                "11223344".to_string(),
                "NAB Reward Saver".to_string(),
                AccountType::Savings,
                Money::new("15420.89"),
            )
            .with_available_balance(Money::new("15420.89"))
            .with_account_number("****3344".to_string())
            .with_bsb("084001".to_string()),
        ]
    }

    /// Three recent movements, newest first.
    fn transactions(account_id: &str) -> Vec<Transaction> {
        let today = Local::now().date_naive();
        let rows = [
            ("001", 1, "EFTPOS Purchase - COLES SUPERMARKET", "-85.67", "2543.67", "Groceries", "COLES SUPERMARKET"),
            ("002", 2, "Direct Credit - SALARY PAYMENT", "2500.00", "2629.34", "Income", "EMPLOYER PTY LTD"),
            ("003", 3, "ATM Withdrawal - NAB ATM", "-100.00", "129.34", "Cash", "NAB ATM"),
        ];

        rows.iter()
            .map(
                |(seq, days_ago, description, amount, balance, category, merchant)| Transaction {
                    id: format!("txn_{}_{}", seq, account_id),
                    date: today - Duration::days(*days_ago),
                    description: description.to_string(),
                    amount: Money::new(*amount),
                    balance: Money::new(*balance),
                    category: Some(category.to_string()),
                    merchant: Some(merchant.to_string()),
                },
            )
            .collect()
    }
}

#[async_trait]
impl AccountProvider for SampleProvider {
    fn name(&self) -> &'static str {
        "sample"
    }

    async fn list_accounts(&self, ctx: &RequestContext) -> Result<Vec<Account>, AcquisitionError> {
        debug!(request_id = %ctx.request_id, "Serving sample accounts");
        let now = Utc::now();
        Ok(Self::accounts()
            .into_iter()
            .map(|mut account| {
                account.touch(now);
                account
            })
            .collect())
    }

    async fn fetch_account_with_transactions(
        &self,
        ctx: &RequestContext,
        account_id: &str,
    ) -> Result<(Account, Vec<Transaction>), AcquisitionError> {
        let account = self
            .list_accounts(ctx)
            .await?
            .into_iter()
            .find(|account| account.id == account_id)
            .ok_or_else(|| AcquisitionError::AccountNotFound(account_id.to_string()))?;

        Ok((account, Self::transactions(account_id)))
    }
}
