use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Budget, BudgetId, BudgetProgress, BudgetStatistics, Category, CategoryId,
    Cents, EntryKind, GoalTotals, SavingsGoal, SavingsGoalId, Template, TemplateId, Transaction,
    TransactionDetails, TransactionId, UserSettings, YearMonth,
};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_GOALS_TEMPLATES};

const ACCOUNT_COLUMNS: &str =
    "id, name, currency, color, icon, opening_balance_cents, is_active, sort_order, created_at";
const CATEGORY_COLUMNS: &str =
    "id, name, kind, color, icon, is_default, is_active, sort_order, created_at";
const TRANSACTION_COLUMNS: &str = "t.id, t.account_id, t.category_id, t.kind, t.amount_cents, t.description, t.occurred_at, t.recorded_at, t.recurrence";
const BUDGET_COLUMNS: &str = "id, category_id, year, month, amount_cents, created_at";
const GOAL_COLUMNS: &str = "id, name, target_cents, current_cents, description, target_date, color, icon, is_completed, created_at";
const TEMPLATE_COLUMNS: &str =
    "id, name, kind, amount_cents, account_id, category_id, description, created_at";

/// Timestamps are stored at second precision in UTC ("2024-01-05T12:00:00Z")
/// so that text comparison in SQL matches chronological order.
fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(s: &str, what: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid {} timestamp", what))?
        .with_timezone(&Utc))
}

fn parse_id(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid {} ID", what))
}

fn parse_kind(s: &str) -> Result<EntryKind> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

/// Spending (or income) grouped under one category for some date range.
#[derive(Debug, Clone)]
pub struct CategoryTotal {
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub total: Cents,
    pub count: i64,
}

/// Income and expense totals of one calendar month.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindTotals {
    pub income: Cents,
    pub expense: Cents,
}

/// Income/expense/count over all transactions of an account.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountTotals {
    pub income: Cents,
    pub expense: Cents,
    pub count: i64,
}

/// Query filter for transaction listings. All fields are optional and
/// combined with AND.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub kind: Option<EntryKind>,
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Data access over the SQLite store. One method per query; validation
/// belongs to the service layer.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run schema migrations. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_GOALS_TEMPLATES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        tracing::debug!("migrations applied");
        Ok(())
    }

    /// Connect and migrate.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    fn insert_account(account: &Account) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, currency, color, icon, opening_balance_cents, is_active, sort_order, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.currency)
        .bind(&account.color)
        .bind(&account.icon)
        .bind(account.opening_balance_cents)
        .bind(account.is_active)
        .bind(account.sort_order)
        .bind(ts(&account.created_at))
    }

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        Self::insert_account(account)
            .execute(&self.pool)
            .await
            .context("Failed to save account")?;
        Ok(())
    }

    pub async fn update_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET name = ?, currency = ?, color = ?, icon = ?, opening_balance_cents = ?, is_active = ?, sort_order = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.name)
        .bind(&account.currency)
        .bind(&account.color)
        .bind(&account.icon)
        .bind(account.opening_balance_cents)
        .bind(account.is_active)
        .bind(account.sort_order)
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update account")?;
        Ok(())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE name = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>> {
        let filter = if include_inactive {
            ""
        } else {
            "WHERE is_active = 1"
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM accounts {} ORDER BY sort_order, name",
            ACCOUNT_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Delete an account. Its transactions go with it (ON DELETE CASCADE).
    pub async fn delete_account(&self, id: AccountId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?;
        Ok(result.rows_affected())
    }

    pub async fn count_accounts(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?;
        Ok(row.get("count"))
    }

    /// Income, expense and transaction count for one account.
    pub async fn account_totals(&self, id: AccountId) -> Result<AccountTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0) AS expense,
                COUNT(*) AS count
            FROM transactions
            WHERE account_id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute account totals")?;

        Ok(AccountTotals {
            income: row.get("income"),
            expense: row.get("expense"),
            count: row.get("count"),
        })
    }

    /// Totals for every account that has at least one transaction.
    pub async fn all_account_totals(&self) -> Result<HashMap<AccountId, AccountTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT
                account_id,
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0) AS expense,
                COUNT(*) AS count
            FROM transactions
            GROUP BY account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute account totals")?;

        let mut totals = HashMap::new();
        for row in rows {
            let id_str: String = row.get("account_id");
            totals.insert(
                parse_id(&id_str, "account")?,
                AccountTotals {
                    income: row.get("income"),
                    expense: row.get("expense"),
                    count: row.get("count"),
                },
            );
        }
        Ok(totals)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: parse_id(&id_str, "account")?,
            name: row.get("name"),
            currency: row.get("currency"),
            color: row.get("color"),
            icon: row.get("icon"),
            opening_balance_cents: row.get("opening_balance_cents"),
            is_active: row.get::<i32, _>("is_active") != 0,
            sort_order: row.get("sort_order"),
            created_at: parse_ts(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Category operations
    // ========================

    fn insert_category(category: &Category) -> Query<'_, Sqlite, SqliteArguments<'_>> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, kind, color, icon, is_default, is_active, sort_order, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id.to_string())
        .bind(&category.name)
        .bind(category.kind.as_str())
        .bind(&category.color)
        .bind(&category.icon)
        .bind(category.is_default)
        .bind(category.is_active)
        .bind(category.sort_order)
        .bind(ts(&category.created_at))
    }

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        Self::insert_category(category)
            .execute(&self.pool)
            .await
            .context("Failed to save category")?;
        Ok(())
    }

    /// Insert categories and accounts in one database transaction; nothing
    /// is kept if any insert fails.
    pub async fn seed(&self, categories: &[Category], accounts: &[Account]) -> Result<()> {
        let mut db_tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for category in categories {
            Self::insert_category(category)
                .execute(&mut *db_tx)
                .await
                .with_context(|| format!("Failed to seed category '{}'", category.name))?;
        }
        for account in accounts {
            Self::insert_account(account)
                .execute(&mut *db_tx)
                .await
                .with_context(|| format!("Failed to seed account '{}'", account.name))?;
        }

        db_tx.commit().await.context("Failed to commit default data")?;
        Ok(())
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, color = ?, icon = ?, is_active = ?, sort_order = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(category.is_active)
        .bind(category.sort_order)
        .bind(category.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update category")?;
        Ok(())
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE id = ?",
            CATEGORY_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE name = ?",
            CATEGORY_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category by name")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    pub async fn list_categories(
        &self,
        kind: Option<EntryKind>,
        include_inactive: bool,
    ) -> Result<Vec<Category>> {
        let mut query = format!("SELECT {} FROM categories WHERE 1=1", CATEGORY_COLUMNS);
        if kind.is_some() {
            query.push_str(" AND kind = ?");
        }
        if !include_inactive {
            query.push_str(" AND is_active = 1");
        }
        query.push_str(" ORDER BY sort_order, name");

        let mut sql_query = sqlx::query(&query);
        if let Some(kind) = kind {
            sql_query = sql_query.bind(kind.as_str());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list categories")?;

        rows.iter().map(Self::row_to_category).collect()
    }

    /// Delete a category. Its transactions become uncategorised and its
    /// budgets are removed (foreign key actions).
    pub async fn delete_category(&self, id: CategoryId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;
        Ok(result.rows_affected())
    }

    pub async fn count_categories(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM categories")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count categories")?;
        Ok(row.get("count"))
    }

    fn row_to_category(row: &SqliteRow) -> Result<Category> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let created_at_str: String = row.get("created_at");

        Ok(Category {
            id: parse_id(&id_str, "category")?,
            name: row.get("name"),
            kind: parse_kind(&kind_str)?,
            color: row.get("color"),
            icon: row.get("icon"),
            is_default: row.get::<i32, _>("is_default") != 0,
            is_active: row.get::<i32, _>("is_active") != 0,
            sort_order: row.get("sort_order"),
            created_at: parse_ts(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    pub async fn save_transaction(&self, tx: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, category_id, kind, amount_cents, description, occurred_at, recorded_at, recurrence)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(tx.id.to_string())
        .bind(tx.account_id.to_string())
        .bind(tx.category_id.map(|id| id.to_string()))
        .bind(tx.kind.as_str())
        .bind(tx.amount_cents)
        .bind(&tx.description)
        .bind(ts(&tx.occurred_at))
        .bind(ts(&tx.recorded_at))
        .bind(tx.recurrence.map(|r| r.as_str()))
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    pub async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET account_id = ?, category_id = ?, kind = ?, amount_cents = ?, description = ?, occurred_at = ?, recurrence = ?
            WHERE id = ?
            "#,
        )
        .bind(tx.account_id.to_string())
        .bind(tx.category_id.map(|id| id.to_string()))
        .bind(tx.kind.as_str())
        .bind(tx.amount_cents)
        .bind(&tx.description)
        .bind(ts(&tx.occurred_at))
        .bind(tx.recurrence.map(|r| r.as_str()))
        .bind(tx.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update transaction")?;
        Ok(())
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;
        Ok(result.rows_affected())
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<TransactionDetails>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}, a.name AS account_name, c.name AS category_name
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            LEFT JOIN categories c ON c.id = t.category_id
            WHERE t.id = ?
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_details).transpose()
    }

    /// List transactions with names resolved, newest first.
    pub async fn list_transactions(&self, filter: &TransactionQuery) -> Result<Vec<TransactionDetails>> {
        let mut query = format!(
            r#"
            SELECT {}, a.name AS account_name, c.name AS category_name
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            LEFT JOIN categories c ON c.id = t.category_id
            WHERE 1=1
            "#,
            TRANSACTION_COLUMNS
        );

        let account_str = filter.account_id.map(|id| id.to_string());
        let category_str = filter.category_id.map(|id| id.to_string());
        let from_str = filter.from.as_ref().map(ts);
        let to_str = filter.to.as_ref().map(ts);

        if account_str.is_some() {
            query.push_str(" AND t.account_id = ?");
        }
        if category_str.is_some() {
            query.push_str(" AND t.category_id = ?");
        }
        if filter.kind.is_some() {
            query.push_str(" AND t.kind = ?");
        }
        if from_str.is_some() {
            query.push_str(" AND t.occurred_at >= ?");
        }
        if to_str.is_some() {
            query.push_str(" AND t.occurred_at < ?");
        }

        query.push_str(" ORDER BY t.occurred_at DESC, t.recorded_at DESC");

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {}", limit));
        }

        let mut sql_query = sqlx::query(&query);
        if let Some(ref id) = account_str {
            sql_query = sql_query.bind(id);
        }
        if let Some(ref id) = category_str {
            sql_query = sql_query.bind(id);
        }
        if let Some(kind) = filter.kind {
            sql_query = sql_query.bind(kind.as_str());
        }
        if let Some(ref from) = from_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = to_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_details).collect()
    }

    /// Sum of one kind of transaction per category in `[from, to)`,
    /// largest first. Uncategorised rows are grouped under a None id.
    pub async fn sum_by_category(
        &self,
        kind: EntryKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CategoryTotal>> {
        let rows = sqlx::query(
            r#"
            SELECT
                t.category_id AS category_id,
                c.name AS category_name,
                c.color AS category_color,
                SUM(t.amount_cents) AS total,
                COUNT(*) AS count
            FROM transactions t
            LEFT JOIN categories c ON c.id = t.category_id
            WHERE t.kind = ? AND t.occurred_at >= ? AND t.occurred_at < ?
            GROUP BY t.category_id
            ORDER BY total DESC
            "#,
        )
        .bind(kind.as_str())
        .bind(ts(&from))
        .bind(ts(&to))
        .fetch_all(&self.pool)
        .await
        .context("Failed to sum transactions by category")?;

        rows.iter()
            .map(|row| {
                let id_str: Option<String> = row.get("category_id");
                Ok(CategoryTotal {
                    category_id: id_str.map(|s| parse_id(&s, "category")).transpose()?,
                    category_name: row.get("category_name"),
                    category_color: row.get("category_color"),
                    total: row.get("total"),
                    count: row.get("count"),
                })
            })
            .collect()
    }

    /// Income and expense totals in `[from, to)`.
    pub async fn totals_by_kind(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<KindTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0) AS expense
            FROM transactions
            WHERE occurred_at >= ? AND occurred_at < ?
            "#,
        )
        .bind(ts(&from))
        .bind(ts(&to))
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute income/expense totals")?;

        Ok(KindTotals {
            income: row.get("income"),
            expense: row.get("expense"),
        })
    }

    /// Income and expense per calendar month of a year. Months without
    /// transactions are absent from the map.
    pub async fn monthly_totals(&self, year: i32) -> Result<HashMap<u32, KindTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT
                CAST(substr(occurred_at, 6, 2) AS INTEGER) AS month,
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents ELSE 0 END), 0) AS income,
                COALESCE(SUM(CASE WHEN kind = 'expense' THEN amount_cents ELSE 0 END), 0) AS expense
            FROM transactions
            WHERE substr(occurred_at, 1, 4) = ?
            GROUP BY month
            "#,
        )
        .bind(format!("{:04}", year))
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute monthly totals")?;

        let mut totals = HashMap::new();
        for row in rows {
            let month: i64 = row.get("month");
            totals.insert(
                u32::try_from(month).context("Invalid month in transactions")?,
                KindTotals {
                    income: row.get("income"),
                    expense: row.get("expense"),
                },
            );
        }
        Ok(totals)
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let account_str: String = row.get("account_id");
        let category_str: Option<String> = row.get("category_id");
        let kind_str: String = row.get("kind");
        let occurred_str: String = row.get("occurred_at");
        let recorded_str: String = row.get("recorded_at");
        let recurrence_str: Option<String> = row.get("recurrence");

        Ok(Transaction {
            id: parse_id(&id_str, "transaction")?,
            account_id: parse_id(&account_str, "account")?,
            category_id: category_str
                .map(|s| parse_id(&s, "category"))
                .transpose()?,
            kind: parse_kind(&kind_str)?,
            amount_cents: row.get("amount_cents"),
            description: row.get("description"),
            occurred_at: parse_ts(&occurred_str, "occurred_at")?,
            recorded_at: parse_ts(&recorded_str, "recorded_at")?,
            recurrence: recurrence_str
                .map(|s| s.parse().map_err(|e: String| anyhow::anyhow!(e)))
                .transpose()?,
        })
    }

    fn row_to_details(row: &SqliteRow) -> Result<TransactionDetails> {
        Ok(TransactionDetails {
            transaction: Self::row_to_transaction(row)?,
            account_name: row.get("account_name"),
            category_name: row.get("category_name"),
        })
    }

    // ========================
    // Budget operations
    // ========================

    /// Insert a budget, or replace the amount of the existing budget for the
    /// same category and month. Returns the stored row.
    pub async fn upsert_budget(&self, budget: &Budget) -> Result<Budget> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO budgets (id, category_id, year, month, amount_cents, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (category_id, year, month) DO UPDATE SET amount_cents = excluded.amount_cents
            RETURNING {}
            "#,
            BUDGET_COLUMNS
        ))
        .bind(budget.id.to_string())
        .bind(budget.category_id.to_string())
        .bind(budget.month.year())
        .bind(budget.month.month() as i64)
        .bind(budget.amount_cents)
        .bind(ts(&budget.created_at))
        .fetch_one(&self.pool)
        .await
        .context("Failed to save budget")?;

        Self::row_to_budget(&row)
    }

    pub async fn get_budget(&self, category_id: CategoryId, month: YearMonth) -> Result<Option<Budget>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM budgets WHERE category_id = ? AND year = ? AND month = ?",
            BUDGET_COLUMNS
        ))
        .bind(category_id.to_string())
        .bind(month.year())
        .bind(month.month() as i64)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    pub async fn list_budgets_for_month(&self, month: YearMonth) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM budgets WHERE year = ? AND month = ? ORDER BY amount_cents DESC",
            BUDGET_COLUMNS
        ))
        .bind(month.year())
        .bind(month.month() as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Every budget of one category, newest month first.
    pub async fn list_budgets_for_category(&self, category_id: CategoryId) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM budgets WHERE category_id = ? ORDER BY year DESC, month DESC",
            BUDGET_COLUMNS
        ))
        .bind(category_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    pub async fn list_all_budgets(&self) -> Result<Vec<Budget>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM budgets ORDER BY year DESC, month DESC, amount_cents DESC",
            BUDGET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    pub async fn delete_budget(&self, id: BudgetId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budget")?;
        Ok(result.rows_affected())
    }

    pub async fn total_budget(&self, month: YearMonth) -> Result<Cents> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) AS total FROM budgets WHERE year = ? AND month = ?",
        )
        .bind(month.year())
        .bind(month.month() as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum budgets")?;

        Ok(row.get("total"))
    }

    /// Every budget of the month with the expense spent in its category
    /// during that month, largest budget first.
    pub async fn budget_progress(&self, month: YearMonth) -> Result<Vec<BudgetProgress>> {
        let (from, to) = month.bounds();
        let rows = sqlx::query(
            r#"
            SELECT
                b.id, b.category_id, b.year, b.month, b.amount_cents, b.created_at,
                c.name AS category_name,
                c.color AS category_color,
                COALESCE((
                    SELECT SUM(t.amount_cents)
                    FROM transactions t
                    WHERE t.category_id = b.category_id
                      AND t.kind = 'expense'
                      AND t.occurred_at >= ? AND t.occurred_at < ?
                ), 0) AS spent
            FROM budgets b
            JOIN categories c ON c.id = b.category_id
            WHERE b.year = ? AND b.month = ?
            ORDER BY b.amount_cents DESC, c.name
            "#,
        )
        .bind(ts(&from))
        .bind(ts(&to))
        .bind(month.year())
        .bind(month.month() as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute budget progress")?;

        rows.iter()
            .map(|row| {
                Ok(BudgetProgress {
                    budget: Self::row_to_budget(row)?,
                    category_name: row.get("category_name"),
                    category_color: row.get("category_color"),
                    spent_cents: row.get("spent"),
                })
            })
            .collect()
    }

    /// Budget and spending totals for each budgeted month of a year,
    /// newest month first. Only spending in budgeted categories counts.
    pub async fn budget_statistics(&self, year: i32) -> Result<Vec<BudgetStatistics>> {
        let rows = sqlx::query(
            r#"
            SELECT
                b.year AS year,
                b.month AS month,
                SUM(b.amount_cents) AS total_budget,
                COALESCE(SUM(s.spent), 0) AS total_spent
            FROM budgets b
            LEFT JOIN (
                SELECT category_id, substr(occurred_at, 1, 7) AS ym, SUM(amount_cents) AS spent
                FROM transactions
                WHERE kind = 'expense' AND category_id IS NOT NULL
                GROUP BY category_id, ym
            ) s ON s.category_id = b.category_id AND s.ym = printf('%04d-%02d', b.year, b.month)
            WHERE b.year = ?
            GROUP BY b.year, b.month
            ORDER BY b.month DESC
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute budget statistics")?;

        rows.iter()
            .map(|row| {
                Ok(BudgetStatistics {
                    month: Self::row_month(row)?,
                    total_budget: row.get("total_budget"),
                    total_spent: row.get("total_spent"),
                })
            })
            .collect()
    }

    /// Copy every budget of `from` into `to` in one database transaction.
    /// Existing budgets in `to` get the source amount.
    pub async fn copy_budgets(&self, from: YearMonth, to: YearMonth) -> Result<usize> {
        let source = self.list_budgets_for_month(from).await?;
        let mut db_tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for budget in &source {
            sqlx::query(
                r#"
                INSERT INTO budgets (id, category_id, year, month, amount_cents, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (category_id, year, month) DO UPDATE SET amount_cents = excluded.amount_cents
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(budget.category_id.to_string())
            .bind(to.year())
            .bind(to.month() as i64)
            .bind(budget.amount_cents)
            .bind(ts(&Utc::now()))
            .execute(&mut *db_tx)
            .await
            .context("Failed to copy budget")?;
        }

        db_tx.commit().await.context("Failed to commit budget copy")?;
        Ok(source.len())
    }

    fn row_month(row: &SqliteRow) -> Result<YearMonth> {
        let year: i64 = row.get("year");
        let month: i64 = row.get("month");
        Ok(YearMonth::new(
            i32::try_from(year).context("Invalid budget year")?,
            u32::try_from(month).context("Invalid budget month")?,
        )?)
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        let id_str: String = row.get("id");
        let category_str: String = row.get("category_id");
        let created_at_str: String = row.get("created_at");

        Ok(Budget {
            id: parse_id(&id_str, "budget")?,
            category_id: parse_id(&category_str, "category")?,
            month: Self::row_month(row)?,
            amount_cents: row.get("amount_cents"),
            created_at: parse_ts(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Savings goal operations
    // ========================

    pub async fn save_goal(&self, goal: &SavingsGoal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO savings_goals (id, name, target_cents, current_cents, description, target_date, color, icon, is_completed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(goal.id.to_string())
        .bind(&goal.name)
        .bind(goal.target_cents)
        .bind(goal.current_cents)
        .bind(&goal.description)
        .bind(goal.target_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&goal.color)
        .bind(&goal.icon)
        .bind(goal.is_completed)
        .bind(ts(&goal.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save savings goal")?;
        Ok(())
    }

    pub async fn update_goal(&self, goal: &SavingsGoal) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE savings_goals
            SET name = ?, target_cents = ?, current_cents = ?, description = ?, target_date = ?, color = ?, icon = ?, is_completed = ?
            WHERE id = ?
            "#,
        )
        .bind(&goal.name)
        .bind(goal.target_cents)
        .bind(goal.current_cents)
        .bind(&goal.description)
        .bind(goal.target_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(&goal.color)
        .bind(&goal.icon)
        .bind(goal.is_completed)
        .bind(goal.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update savings goal")?;
        Ok(())
    }

    pub async fn get_goal_by_name(&self, name: &str) -> Result<Option<SavingsGoal>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM savings_goals WHERE name = ?",
            GOAL_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch savings goal")?;

        row.as_ref().map(Self::row_to_goal).transpose()
    }

    /// Goals in progress first, then newest first.
    pub async fn list_goals(&self) -> Result<Vec<SavingsGoal>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM savings_goals ORDER BY is_completed ASC, created_at DESC, name",
            GOAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list savings goals")?;

        rows.iter().map(Self::row_to_goal).collect()
    }

    pub async fn delete_goal(&self, id: SavingsGoalId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM savings_goals WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete savings goal")?;
        Ok(result.rows_affected())
    }

    /// Sums over goals that are not yet completed.
    pub async fn goal_totals(&self) -> Result<GoalTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(target_cents), 0) AS total_target,
                COALESCE(SUM(current_cents), 0) AS total_current,
                COUNT(*) AS active_goals
            FROM savings_goals
            WHERE is_completed = 0
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute savings goal totals")?;

        Ok(GoalTotals {
            total_target: row.get("total_target"),
            total_current: row.get("total_current"),
            active_goals: row.get("active_goals"),
        })
    }

    fn row_to_goal(row: &SqliteRow) -> Result<SavingsGoal> {
        let id_str: String = row.get("id");
        let target_date_str: Option<String> = row.get("target_date");
        let created_at_str: String = row.get("created_at");

        Ok(SavingsGoal {
            id: parse_id(&id_str, "savings goal")?,
            name: row.get("name"),
            target_cents: row.get("target_cents"),
            current_cents: row.get("current_cents"),
            description: row.get("description"),
            target_date: target_date_str
                .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
                .transpose()
                .context("Invalid target_date")?,
            color: row.get("color"),
            icon: row.get("icon"),
            is_completed: row.get::<i32, _>("is_completed") != 0,
            created_at: parse_ts(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Template operations
    // ========================

    pub async fn save_template(&self, template: &Template) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO templates (id, name, kind, amount_cents, account_id, category_id, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(template.id.to_string())
        .bind(&template.name)
        .bind(template.kind.as_str())
        .bind(template.amount_cents)
        .bind(template.account_id.map(|id| id.to_string()))
        .bind(template.category_id.map(|id| id.to_string()))
        .bind(&template.description)
        .bind(ts(&template.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to save template")?;
        Ok(())
    }

    pub async fn get_template_by_name(&self, name: &str) -> Result<Option<Template>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM templates WHERE name = ?",
            TEMPLATE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch template")?;

        row.as_ref().map(Self::row_to_template).transpose()
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM templates ORDER BY name",
            TEMPLATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list templates")?;

        rows.iter().map(Self::row_to_template).collect()
    }

    pub async fn delete_template(&self, id: TemplateId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM templates WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete template")?;
        Ok(result.rows_affected())
    }

    fn row_to_template(row: &SqliteRow) -> Result<Template> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let account_str: Option<String> = row.get("account_id");
        let category_str: Option<String> = row.get("category_id");
        let created_at_str: String = row.get("created_at");

        Ok(Template {
            id: parse_id(&id_str, "template")?,
            name: row.get("name"),
            kind: parse_kind(&kind_str)?,
            amount_cents: row.get("amount_cents"),
            account_id: account_str.map(|s| parse_id(&s, "account")).transpose()?,
            category_id: category_str
                .map(|s| parse_id(&s, "category"))
                .transpose()?,
            description: row.get("description"),
            created_at: parse_ts(&created_at_str, "created_at")?,
        })
    }

    // ========================
    // Settings
    // ========================

    pub async fn get_settings(&self) -> Result<UserSettings> {
        let row = sqlx::query(
            "SELECT currency, monthly_income_cents, savings_target_cents FROM user_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch settings")?;

        Ok(match row {
            Some(row) => UserSettings {
                currency: row.get("currency"),
                monthly_income_cents: row.get("monthly_income_cents"),
                savings_target_cents: row.get("savings_target_cents"),
            },
            None => UserSettings::default(),
        })
    }

    pub async fn save_settings(&self, settings: &UserSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (id, currency, monthly_income_cents, savings_target_cents)
            VALUES (1, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                currency = excluded.currency,
                monthly_income_cents = excluded.monthly_income_cents,
                savings_target_cents = excluded.savings_target_cents
            "#,
        )
        .bind(&settings.currency)
        .bind(settings.monthly_income_cents)
        .bind(settings.savings_target_cents)
        .execute(&self.pool)
        .await
        .context("Failed to save settings")?;
        Ok(())
    }
}
