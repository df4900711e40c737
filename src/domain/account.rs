use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AccountId = Uuid;

pub const DEFAULT_ACCOUNT_COLOR: &str = "#007AFF";
pub const DEFAULT_ACCOUNT_ICON: &str = "credit-card";

/// A named holder of money: cash, a card, a savings account.
///
/// The balance is never stored. It is derived from `opening_balance_cents`
/// plus incoming income minus outgoing expenses, so editing or deleting a
/// transaction can't leave the account out of sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub currency: String,
    pub color: String,
    pub icon: String,
    pub opening_balance_cents: Cents,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: String, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            currency,
            color: DEFAULT_ACCOUNT_COLOR.to_string(),
            icon: DEFAULT_ACCOUNT_ICON.to_string(),
            opening_balance_cents: 0,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_opening_balance(mut self, cents: Cents) -> Self {
        self.opening_balance_cents = cents;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// An account together with its derived figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account: Account,
    pub balance: Cents,
    pub total_income: Cents,
    pub total_expense: Cents,
    pub transaction_count: i64,
}

impl AccountSummary {
    pub fn from_totals(account: Account, total_income: Cents, total_expense: Cents, count: i64) -> Self {
        let balance = account.opening_balance_cents + total_income - total_expense;
        Self {
            account,
            balance,
            total_income,
            total_expense,
            transaction_count: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new("Cash".into(), "EUR".into());
        assert!(account.is_active);
        assert_eq!(account.opening_balance_cents, 0);
        assert_eq!(account.color, DEFAULT_ACCOUNT_COLOR);
    }

    #[test]
    fn test_summary_balance_is_derived() {
        let account = Account::new("Card".into(), "EUR".into()).with_opening_balance(10000);
        let summary = AccountSummary::from_totals(account, 5000, 12500, 3);
        assert_eq!(summary.balance, 2500);
        assert_eq!(summary.transaction_count, 3);
    }
}
