// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use fintrack::application::{FinanceService, NewTransaction};
use fintrack::domain::{EntryKind, TransactionDetails};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(FinanceService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = FinanceService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Record an income or expense with only the common fields set.
pub async fn record(
    service: &FinanceService,
    account: &str,
    kind: EntryKind,
    amount: i64,
    category: Option<&str>,
    date: &str,
) -> Result<TransactionDetails> {
    Ok(service
        .record_transaction(NewTransaction {
            account: account.to_string(),
            kind,
            amount_cents: amount,
            category: category.map(str::to_string),
            description: None,
            occurred_at: parse_date(date),
            recurrence: None,
        })
        .await?)
}

/// Test fixture: Standard account and category setup
pub struct StandardSetup;

impl StandardSetup {
    /// Accounts Checking (1000.00 opening) and Cash, in EUR
    pub async fn create_accounts(service: &FinanceService) -> Result<()> {
        service
            .create_account("Checking".into(), Some("EUR".into()), 100000)
            .await?;
        service
            .create_account("Cash".into(), Some("EUR".into()), 0)
            .await?;
        Ok(())
    }

    /// Expense categories Groceries, Dining, Rent and income category Salary
    pub async fn create_categories(service: &FinanceService) -> Result<()> {
        for name in ["Groceries", "Dining", "Rent"] {
            service
                .create_category(name.into(), EntryKind::Expense, None, None)
                .await?;
        }
        service
            .create_category("Salary".into(), EntryKind::Income, None, None)
            .await?;
        Ok(())
    }

    pub async fn create_all(service: &FinanceService) -> Result<()> {
        Self::create_accounts(service).await?;
        Self::create_categories(service).await
    }
}
