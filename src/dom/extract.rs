//! Pattern based field extraction over flattened page text.
//!
//! Every rule is independent and returns `None` (or a default) when it
//! finds nothing, so a page that only partly matches still yields records.
//! Accounts are anchored on currency amounts: each amount found on the page
//! becomes one account, and the text between the previous amount and this
//! one is the context its other fields are read from.

use crate::types::{Account, AccountType, Money};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::text::flatten;

// The leading group stands in for a lookbehind: an amount may not continue
// a run of digits or commas.
static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d,])((-)?\$?((?:\d{1,3}(?:,\d{3})+|\d+)\.\d{2}))\b")
        .expect("amount pattern is valid")
});

static MASKED_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*•Xx]{4}\d{4}\b").expect("masked number pattern is valid"));

static BSB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{3})[- ]?(\d{3})\b").expect("bsb pattern is valid"));

static ACCOUNT_ID_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\b\d{6}-\d{8}\b", r"\b\d{10}\b", r"\b\d{8}\b"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("account id pattern is valid"))
        .collect()
});

/// Checked in order; the first group with a keyword present wins.
const TYPE_KEYWORDS: &[(AccountType, &[&str])] = &[
    (AccountType::Savings, &["saver", "savings"]),
    (AccountType::Credit, &["credit"]),
    (AccountType::Loan, &["loan", "mortgage"]),
    (AccountType::Investment, &["investment", "term deposit"]),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Known product names, matched case-insensitively before any guessing.
    pub product_names: Vec<String>,
    /// Prefix for accounts whose name cannot be recovered.
    pub placeholder_name: String,
    pub min_name_len: usize,
    pub max_name_len: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            product_names: vec![
                "Complete Access Account".to_string(),
                "NAB Classic Banking".to_string(),
                "NAB Reward Saver".to_string(),
                "Premium Cash Management".to_string(),
                "Business Banking Account".to_string(),
            ],
            placeholder_name: "NAB Account".to_string(),
            min_name_len: 6,
            max_name_len: 49,
        }
    }
}

/// One currency amount found in a text, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountMatch {
    pub start: usize,
    pub end: usize,
    pub amount: Money,
}

/// Every currency amount in `text`, normalised to `[-]digits.cc`.
pub fn find_amounts(text: &str) -> Vec<AmountMatch> {
    AMOUNT_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(1)?;
            let digits = caps.get(3)?.as_str().replace(',', "");
            let sign = if caps.get(2).is_some() { "-" } else { "" };
            Some(AmountMatch {
                start: whole.start(),
                end: whole.end(),
                amount: Money::new(format!("{}{}", sign, digits)),
            })
        })
        .collect()
}

pub fn extract_balance(text: &str) -> Option<Money> {
    find_amounts(text).into_iter().next().map(|m| m.amount)
}

pub fn extract_account_number(text: &str) -> Option<String> {
    MASKED_NUMBER_RE.find(text).map(|m| m.as_str().to_string())
}

pub fn extract_bsb(text: &str) -> Option<String> {
    BSB_RE
        .captures(text)
        .map(|caps| format!("{}{}", &caps[1], &caps[2]))
}

pub fn extract_account_id(text: &str) -> Option<String> {
    ACCOUNT_ID_RES
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str().to_string())
}

pub fn classify_account_type(text: &str) -> AccountType {
    let lower = text.to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(account_type, _)| *account_type)
        .unwrap_or(AccountType::Checking)
}

/// Catalogue match first, then the first line of plausible length that
/// mentions "account".
pub fn extract_account_name(text: &str, rules: &ExtractionRules) -> Option<String> {
    let lower = text.to_lowercase();
    if let Some(name) = rules
        .product_names
        .iter()
        .find(|name| lower.contains(&name.to_lowercase()))
    {
        return Some(name.clone());
    }

    text.lines()
        .map(str::trim)
        .find(|line| {
            let len = line.chars().count();
            len >= rules.min_name_len
                && len <= rules.max_name_len
                && line.to_lowercase().contains("account")
        })
        .map(str::to_string)
}

pub struct AccountExtractor {
    rules: ExtractionRules,
}

impl AccountExtractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    /// Turns a rendered page into account records, one per amount found.
    /// A balance printed twice for the same account yields two records.
    pub fn extract_accounts(&self, page: &str) -> Vec<Account> {
        let text = flatten(page);
        let anchors = find_amounts(&text);
        let mut used_ids = HashSet::new();
        let mut accounts = Vec::with_capacity(anchors.len());
        let mut context_start = 0;

        for (index, anchor) in anchors.into_iter().enumerate() {
            let position = index + 1;
            let context = &text[context_start..anchor.end];
            context_start = anchor.end;

            let id = extract_account_id(context)
                .filter(|id| !used_ids.contains(id))
                .unwrap_or_else(|| format!("account_{}", position));
            used_ids.insert(id.clone());

            let name = extract_account_name(context, &self.rules)
                .unwrap_or_else(|| format!("{} {}", self.rules.placeholder_name, position));

            let mut account = Account::new(
                id,
                name,
                classify_account_type(context),
                anchor.amount.clone(),
            )
            .with_available_balance(anchor.amount);

            if let Some(number) = extract_account_number(context) {
                account = account.with_account_number(number);
            }
            if let Some(bsb) = extract_bsb(context) {
                account = account.with_bsb(bsb);
            }

            accounts.push(account);
        }

        debug!(count = accounts.len(), "Extracted accounts from page text");
        accounts
    }
}

impl Default for AccountExtractor {
    fn default() -> Self {
        Self::new(ExtractionRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DASHBOARD_HTML;

    #[test]
    fn test_amounts_are_normalised() {
        let amounts: Vec<String> = find_amounts("Total $1,234,567.89 owing -$12.50 and 0.99")
            .into_iter()
            .map(|m| m.amount.amount)
            .collect();
        assert_eq!(amounts, vec!["1234567.89", "-12.50", "0.99"]);
    }

    #[test]
    fn test_malformed_grouping_is_not_truncated() {
        assert!(find_amounts("1234,567.89").is_empty());
        assert!(find_amounts("Total 12,34.56").is_empty());

        let found = find_amounts("10.00,20.00");
        let amounts: Vec<&str> = found.iter().map(|m| m.amount.as_str()).collect();
        assert_eq!(amounts, vec!["10.00"]);
    }

    #[test]
    fn test_amount_span_excludes_boundary_character() {
        let text = "Balance: -$12.50";
        let found = find_amounts(text);
        assert_eq!(&text[found[0].start..found[0].end], "-$12.50");
    }

    #[test]
    fn test_amount_needs_exactly_two_fraction_digits() {
        assert!(find_amounts("version 2.5 or 3.141").is_empty());
        assert_eq!(extract_balance("none here"), None);
    }

    #[test]
    fn test_amount_extraction_is_idempotent() {
        let first: Vec<String> = find_amounts("$2,543.67 then $847.23 then -$15,420.89")
            .into_iter()
            .map(|m| m.amount.amount)
            .collect();
        let second: Vec<String> = find_amounts(&first.join(" "))
            .into_iter()
            .map(|m| m.amount.amount)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_masked_number_keeps_prefix() {
        assert_eq!(
            extract_account_number("Acct ****1234 open"),
            Some("****1234".to_string())
        );
        assert_eq!(extract_account_number("***1234"), None);
    }

    #[test]
    fn test_bsb_with_and_without_separator() {
        assert_eq!(extract_bsb("BSB 084-001"), Some("084001".to_string()));
        assert_eq!(extract_bsb("BSB 084001"), Some("084001".to_string()));
        assert_eq!(extract_bsb("no code"), None);
    }

    #[test]
    fn test_account_id_pattern_order() {
        assert_eq!(
            extract_account_id("083-004 123456-12345678"),
            Some("123456-12345678".to_string())
        );
        assert_eq!(
            extract_account_id("ref 12345678"),
            Some("12345678".to_string())
        );
        assert_eq!(extract_account_id("****5678"), None);
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify_account_type("NAB Reward Saver"), AccountType::Savings);
        assert_eq!(classify_account_type("Low Rate Credit Card"), AccountType::Credit);
        assert_eq!(classify_account_type("Home Loan"), AccountType::Loan);
        assert_eq!(
            classify_account_type("Investment portfolio"),
            AccountType::Investment
        );
        assert_eq!(classify_account_type("Everyday"), AccountType::Checking);
        // savings terms are checked before credit
        assert_eq!(
            classify_account_type("credit to reward saver"),
            AccountType::Savings
        );
    }

    #[test]
    fn test_name_catalogue_then_line_scan() {
        let rules = ExtractionRules::default();
        assert_eq!(
            extract_account_name("your nab reward saver balance", &rules),
            Some("NAB Reward Saver".to_string())
        );
        assert_eq!(
            extract_account_name("x\n  Everyday Account  \nmore", &rules),
            Some("Everyday Account".to_string())
        );
        assert_eq!(extract_account_name("Acct\nBalance", &rules), None);
    }

    #[test]
    fn test_dashboard_page() {
        let accounts = AccountExtractor::default().extract_accounts(DASHBOARD_HTML);
        assert_eq!(accounts.len(), 3);

        assert_eq!(accounts[0].id, "account_1");
        assert_eq!(accounts[0].name, "Complete Access Account");
        assert_eq!(accounts[0].balance.as_str(), "2543.67");
        assert_eq!(accounts[0].bsb.as_deref(), Some("084001"));
        assert_eq!(accounts[0].account_number.as_deref(), Some("****5678"));
        assert_eq!(accounts[0].account_type, AccountType::Checking);

        assert_eq!(accounts[1].name, "NAB Reward Saver");
        assert_eq!(accounts[1].account_type, AccountType::Savings);
        assert_eq!(accounts[1].balance.as_str(), "15420.89");
        assert_eq!(accounts[1].bsb, None);

        assert_eq!(accounts[2].id, "account_3");
        assert_eq!(accounts[2].name, "NAB Account 3");
        assert_eq!(accounts[2].account_type, AccountType::Credit);
        assert_eq!(accounts[2].balance.as_str(), "-847.23");
        assert_eq!(
            accounts[2].available_balance.as_ref().map(Money::as_str),
            Some("-847.23")
        );
    }

    #[test]
    fn test_stronger_identifier_is_used_once() {
        let page = "Account 12345678\n$10.00\nAccount 12345678\n$20.00";
        let accounts = AccountExtractor::default().extract_accounts(page);
        assert_eq!(accounts[0].id, "12345678");
        assert_eq!(accounts[1].id, "account_2");
    }

    #[test]
    fn test_page_without_amounts_is_empty() {
        let accounts = AccountExtractor::default().extract_accounts("<html><body>Welcome</body></html>");
        assert!(accounts.is_empty());
    }
}
