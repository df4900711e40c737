use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::{FinanceService, TransactionFilter};
use crate::domain::{
    Account, Budget, Category, SavingsGoal, Template, TransactionDetails, UserSettings,
    YearMonth, format_cents,
};

/// Everything in the database, for backups or moving to another tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub settings: UserSettings,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<TransactionDetails>,
    pub budgets: Vec<Budget>,
    pub goals: Vec<SavingsGoal>,
    pub templates: Vec<Template>,
}

/// Exporter for converting finance data to CSV and JSON
pub struct Exporter<'a> {
    service: &'a FinanceService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a FinanceService) -> Self {
        Self { service }
    }

    /// Export every transaction, newest first
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self
            .service
            .list_transactions(TransactionFilter::default())
            .await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "type",
            "amount",
            "account",
            "category",
            "description",
            "recurrence",
        ])?;

        for details in &transactions {
            let tx = &details.transaction;
            csv_writer.write_record([
                tx.id.to_string(),
                tx.occurred_at.to_rfc3339(),
                tx.kind.to_string(),
                format_cents(tx.amount_cents),
                details.account_name.clone(),
                details.category_name.clone().unwrap_or_default(),
                tx.description.clone().unwrap_or_default(),
                tx.recurrence.map(|r| r.to_string()).unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export active accounts with their derived balances
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let summaries = self.service.all_account_summaries().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["account", "currency", "income", "expense", "balance"])?;

        for summary in &summaries {
            csv_writer.write_record([
                summary.account.name.as_str(),
                summary.account.currency.as_str(),
                &format_cents(summary.total_income),
                &format_cents(summary.total_expense),
                &format_cents(summary.balance),
            ])?;
        }

        csv_writer.flush()?;
        Ok(summaries.len())
    }

    /// Export the budgets of one month with what has been spent against them
    pub async fn export_budgets_csv<W: Write>(&self, writer: W, month: YearMonth) -> Result<usize> {
        let progress = self.service.budget_progress(month).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["month", "category", "budget", "spent", "remaining", "progress"])?;

        for p in &progress {
            csv_writer.write_record([
                month.to_string(),
                p.category_name.clone(),
                format_cents(p.budget.amount_cents),
                format_cents(p.spent_cents),
                format_cents(p.budget.amount_cents - p.spent_cents),
                format!("{:.1}", p.progress_percent()),
            ])?;
        }

        csv_writer.flush()?;
        Ok(progress.len())
    }

    pub async fn export_goals_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let goals = self.service.list_goals().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "name",
            "target",
            "current",
            "remaining",
            "progress",
            "target_date",
            "completed",
        ])?;

        for goal in &goals {
            csv_writer.write_record([
                goal.name.clone(),
                format_cents(goal.target_cents),
                format_cents(goal.current_cents),
                format_cents(goal.remaining()),
                goal.progress_percent().to_string(),
                goal.target_date.map(|d| d.to_string()).unwrap_or_default(),
                goal.is_completed.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(goals.len())
    }

    /// Export full database as JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            settings: self.service.settings().await?,
            accounts: self.service.list_accounts(true).await?,
            categories: self.service.list_categories(None, true).await?,
            transactions: self
                .service
                .list_transactions(TransactionFilter::default())
                .await?,
            budgets: self.service.list_all_budgets().await?,
            goals: self.service.list_goals().await?,
            templates: self.service.list_templates().await?,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;

        Ok(snapshot)
    }
}
