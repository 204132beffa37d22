use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount kept as a decimal string with exactly two fraction
/// digits, so no floating point rounding is ever involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: String,
}

impl Money {
    pub fn new(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.amount
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Savings,
    Checking,
    Credit,
    Loan,
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Checking => "checking",
            AccountType::Credit => "credit",
            AccountType::Loan => "loan",
            AccountType::Investment => "investment",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_balance: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bsb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(id: String, name: String, account_type: AccountType, balance: Money) -> Self {
        Self {
            id,
            name,
            account_type,
            balance,
            available_balance: None,
            account_number: None,
            bsb: None,
            last_updated: None,
        }
    }

    pub fn with_available_balance(mut self, available: Money) -> Self {
        self.available_balance = Some(available);
        self
    }

    pub fn with_account_number(mut self, number: String) -> Self {
        self.account_number = Some(number);
        self
    }

    pub fn with_bsb(mut self, bsb: String) -> Self {
        self.bsb = Some(bsb);
        self
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = Some(at);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
    pub retrieved_at: DateTime<Utc>,
    pub count: usize,
}

impl AccountsResponse {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            count: accounts.len(),
            accounts,
            retrieved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    #[serde(flatten)]
    pub account: Account,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub transactions: Vec<Transaction>,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub recent_transaction_count: usize,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl AccountDetails {
    pub fn new(account: Account, transactions: Vec<Transaction>) -> Self {
        Self {
            recent_transaction_count: transactions.len(),
            account,
            transactions,
        }
    }
}

/// Body of a single-account lookup: `{"account": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetailsResponse {
    pub account: AccountDetails,
}

impl From<AccountDetails> for AccountDetailsResponse {
    fn from(account: AccountDetails) -> Self {
        Self { account }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&crate::errors::AcquisitionError> for ErrorResponse {
    fn from(err: &crate::errors::AcquisitionError) -> Self {
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_serializes_with_type_key() {
        let account = Account::new(
            "12345678".into(),
            "Complete Access Account".into(),
            AccountType::Savings,
            Money::new("2543.67"),
        )
        .with_bsb("084001".into());

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["type"], "savings");
        assert_eq!(json["balance"]["amount"], "2543.67");
        assert_eq!(json["bsb"], "084001");
        assert!(json.get("accountNumber").is_none());
    }

    #[test]
    fn test_details_response_wraps_account() {
        let account = Account::new(
            "87654321".into(),
            "NAB Classic Banking Account".into(),
            AccountType::Checking,
            Money::new("847.23"),
        );

        let empty = serde_json::to_value(AccountDetailsResponse::from(AccountDetails::new(
            account.clone(),
            vec![],
        )))
        .unwrap();
        assert_eq!(empty["account"]["id"], "87654321");
        assert_eq!(empty["account"]["type"], "checking");
        assert!(empty["account"].get("recentTransactionCount").is_none());
        assert!(empty["account"].get("transactions").is_none());

        let transaction = Transaction {
            id: "txn_001_87654321".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            description: "ATM Withdrawal - NAB ATM".into(),
            amount: Money::new("-100.00"),
            balance: Money::new("747.23"),
            category: None,
            merchant: None,
        };
        let full = serde_json::to_value(AccountDetailsResponse::from(AccountDetails::new(
            account,
            vec![transaction],
        )))
        .unwrap();
        assert_eq!(full["account"]["recentTransactionCount"], 1);
        assert_eq!(full["account"]["transactions"][0]["date"], "2024-03-08");
    }

    #[test]
    fn test_accounts_response_counts() {
        let response = AccountsResponse::new(vec![]);
        assert_eq!(response.count, 0);
    }
}
