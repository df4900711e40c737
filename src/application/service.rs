use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{
    Account, AccountSummary, Budget, BudgetProgress, BudgetStatistics, Category, Cents, EntryKind,
    GoalTotals, Recurrence, SavingsGoal, Template, Transaction, TransactionDetails, TransactionId,
    UserSettings, YearMonth, default_categories, format_cents,
};
use crate::storage::{Repository, TransactionQuery};

use super::{
    AppError, CategoryReport, MonthTotals, MonthlySummary, MonthlyTrend, SavingsOverview,
    summarize_categories,
};

/// Application service providing every finance-tracking operation.
/// This is the primary interface for any client (CLI, tests, future UIs).
pub struct FinanceService {
    repo: Repository,
}

/// Everything needed to record a new transaction. Names are resolved and
/// validated by the service.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account: String,
    pub kind: EntryKind,
    pub amount_cents: Cents,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub recurrence: Option<Recurrence>,
}

/// Partial update of a transaction; `None` leaves a field untouched.
/// The nested options clear the field when set to `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub account: Option<String>,
    pub kind: Option<EntryKind>,
    pub amount_cents: Option<Cents>,
    pub category: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub recurrence: Option<Option<Recurrence>>,
}

/// Filter for listing transactions by name rather than id.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account: Option<String>,
    pub category: Option<String>,
    pub kind: Option<EntryKind>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub currency: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct GoalUpdate {
    pub name: Option<String>,
    pub target_cents: Option<Cents>,
    pub current_cents: Option<Cents>,
    pub description: Option<Option<String>>,
    pub target_date: Option<Option<chrono::NaiveDate>>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub currency: Option<String>,
    pub monthly_income_cents: Option<Cents>,
    pub savings_target_cents: Option<Cents>,
}

fn require_positive(amount_cents: Cents, what: &str) -> Result<(), AppError> {
    if amount_cents <= 0 {
        return Err(AppError::InvalidAmount(format!("{} must be positive", what)));
    }
    Ok(())
}

impl FinanceService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create (if needed) and migrate the database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Open an existing database. Migrations are re-applied so files created
    /// by older versions pick up new tables.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Create an account. Without a currency the settings default is used.
    pub async fn create_account(
        &self,
        name: String,
        currency: Option<String>,
        opening_balance_cents: Cents,
    ) -> Result<Account, AppError> {
        if self.repo.get_account_by_name(&name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name));
        }

        let currency = match currency {
            Some(c) => c,
            None => self.repo.get_settings().await?.currency,
        };
        let account = Account::new(name, currency).with_opening_balance(opening_balance_cents);

        self.repo.save_account(&account).await?;
        info!(account = %account.name, opening = opening_balance_cents, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, name: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_name(name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    pub async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts(include_inactive).await?)
    }

    pub async fn update_account(&self, name: &str, update: AccountUpdate) -> Result<Account, AppError> {
        let mut account = self.get_account(name).await?;

        if let Some(new_name) = update.name {
            if new_name != account.name && self.repo.get_account_by_name(&new_name).await?.is_some() {
                return Err(AppError::AccountAlreadyExists(new_name));
            }
            account.name = new_name;
        }
        if let Some(currency) = update.currency {
            account.currency = currency;
        }
        if let Some(color) = update.color {
            account.color = color;
        }
        if let Some(icon) = update.icon {
            account.icon = icon;
        }
        if let Some(sort_order) = update.sort_order {
            account.sort_order = sort_order;
        }

        self.repo.update_account(&account).await?;
        debug!(account = %account.name, "account updated");
        Ok(account)
    }

    /// Hide an account from listings and block new transactions on it.
    pub async fn archive_account(&self, name: &str) -> Result<Account, AppError> {
        let mut account = self.get_account(name).await?;
        account.is_active = false;
        self.repo.update_account(&account).await?;
        info!(account = %account.name, "account archived");
        Ok(account)
    }

    /// Delete an account together with all of its transactions.
    pub async fn delete_account(&self, name: &str) -> Result<Account, AppError> {
        let account = self.get_account(name).await?;
        self.repo.delete_account(account.id).await?;
        info!(account = %account.name, "account deleted");
        Ok(account)
    }

    pub async fn account_summary(&self, name: &str) -> Result<AccountSummary, AppError> {
        let account = self.get_account(name).await?;
        let totals = self.repo.account_totals(account.id).await?;
        Ok(AccountSummary::from_totals(
            account,
            totals.income,
            totals.expense,
            totals.count,
        ))
    }

    /// Summaries for all active accounts, in display order.
    pub async fn all_account_summaries(&self) -> Result<Vec<AccountSummary>, AppError> {
        let accounts = self.repo.list_accounts(false).await?;
        let totals = self.repo.all_account_totals().await?;

        Ok(accounts
            .into_iter()
            .map(|account| {
                let t = totals.get(&account.id).copied().unwrap_or_default();
                AccountSummary::from_totals(account, t.income, t.expense, t.count)
            })
            .collect())
    }

    /// Correct an account balance by `delta` without recording a transaction.
    pub async fn adjust_balance(&self, name: &str, delta: Cents) -> Result<AccountSummary, AppError> {
        let mut account = self.get_account(name).await?;
        account.opening_balance_cents = account
            .opening_balance_cents
            .checked_add(delta)
            .ok_or_else(|| AppError::InvalidAmount("Balance adjustment overflows".into()))?;
        self.repo.update_account(&account).await?;
        info!(account = %account.name, delta, "balance adjusted");
        self.account_summary(&account.name).await
    }

    // ========================
    // Category operations
    // ========================

    pub async fn create_category(
        &self,
        name: String,
        kind: EntryKind,
        color: Option<String>,
        icon: Option<String>,
    ) -> Result<Category, AppError> {
        if self.repo.get_category_by_name(&name).await?.is_some() {
            return Err(AppError::CategoryAlreadyExists(name));
        }

        let mut category = Category::new(name, kind);
        if let Some(color) = color {
            category = category.with_color(color);
        }
        if let Some(icon) = icon {
            category = category.with_icon(icon);
        }

        self.repo.save_category(&category).await?;
        info!(category = %category.name, kind = %category.kind, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, name: &str) -> Result<Category, AppError> {
        self.repo
            .get_category_by_name(name)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(name.to_string()))
    }

    pub async fn list_categories(
        &self,
        kind: Option<EntryKind>,
        include_inactive: bool,
    ) -> Result<Vec<Category>, AppError> {
        Ok(self.repo.list_categories(kind, include_inactive).await?)
    }

    pub async fn update_category(
        &self,
        name: &str,
        update: CategoryUpdate,
    ) -> Result<Category, AppError> {
        let mut category = self.get_category(name).await?;

        if let Some(new_name) = update.name {
            if new_name != category.name
                && self.repo.get_category_by_name(&new_name).await?.is_some()
            {
                return Err(AppError::CategoryAlreadyExists(new_name));
            }
            category.name = new_name;
        }
        if let Some(color) = update.color {
            category.color = color;
        }
        if let Some(icon) = update.icon {
            category.icon = icon;
        }
        if let Some(sort_order) = update.sort_order {
            category.sort_order = sort_order;
        }

        self.repo.update_category(&category).await?;
        debug!(category = %category.name, "category updated");
        Ok(category)
    }

    pub async fn archive_category(&self, name: &str) -> Result<Category, AppError> {
        let mut category = self.get_category(name).await?;
        category.is_active = false;
        self.repo.update_category(&category).await?;
        info!(category = %category.name, "category archived");
        Ok(category)
    }

    /// Delete a category. Its transactions become uncategorised and its
    /// budgets are removed.
    pub async fn delete_category(&self, name: &str) -> Result<Category, AppError> {
        let category = self.get_category(name).await?;
        self.repo.delete_category(category.id).await?;
        info!(category = %category.name, "category deleted");
        Ok(category)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Account that may receive a new entry.
    async fn usable_account(&self, name: &str) -> Result<Account, AppError> {
        let account = self.get_account(name).await?;
        if !account.is_active {
            return Err(AppError::AccountArchived(account.name));
        }
        Ok(account)
    }

    /// Category that may classify a new entry of the given kind.
    async fn usable_category(&self, name: &str, kind: EntryKind) -> Result<Category, AppError> {
        let category = self.get_category(name).await?;
        if !category.is_active {
            return Err(AppError::CategoryArchived(category.name));
        }
        if category.kind != kind {
            return Err(AppError::CategoryKindMismatch {
                category: category.name,
                category_kind: category.kind,
                requested: kind,
            });
        }
        Ok(category)
    }

    async fn details_of(&self, id: TransactionId) -> Result<TransactionDetails, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// Record an income or expense.
    pub async fn record_transaction(
        &self,
        input: NewTransaction,
    ) -> Result<TransactionDetails, AppError> {
        require_positive(input.amount_cents, "Amount")?;

        let account = self.usable_account(&input.account).await?;
        let category = match &input.category {
            Some(name) => Some(self.usable_category(name, input.kind).await?),
            None => None,
        };

        let mut tx = Transaction::new(account.id, input.kind, input.amount_cents, input.occurred_at);
        if let Some(category) = &category {
            tx = tx.with_category(category.id);
        }
        if let Some(description) = input.description {
            tx = tx.with_description(description);
        }
        if let Some(recurrence) = input.recurrence {
            tx = tx.with_recurrence(recurrence);
        }

        self.repo.save_transaction(&tx).await?;
        info!(
            id = %tx.id,
            account = %account.name,
            kind = %tx.kind,
            amount = %format_cents(tx.amount_cents),
            "transaction recorded"
        );

        Ok(TransactionDetails {
            transaction: tx,
            account_name: account.name,
            category_name: category.map(|c| c.name),
        })
    }

    pub async fn get_transaction_details(
        &self,
        id: TransactionId,
    ) -> Result<TransactionDetails, AppError> {
        self.details_of(id).await
    }

    /// List transactions, newest first.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<TransactionDetails>, AppError> {
        let account_id = match &filter.account {
            Some(name) => Some(self.get_account(name).await?.id),
            None => None,
        };
        let category_id = match &filter.category {
            Some(name) => Some(self.get_category(name).await?.id),
            None => None,
        };

        let query = TransactionQuery {
            account_id,
            category_id,
            kind: filter.kind,
            from: filter.from_date,
            to: filter.to_date,
            limit: filter.limit,
        };
        Ok(self.repo.list_transactions(&query).await?)
    }

    /// Apply a partial update, re-validating the resulting transaction.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<TransactionDetails, AppError> {
        let mut tx = self.details_of(id).await?.transaction;

        if let Some(kind) = update.kind {
            tx.kind = kind;
        }
        if let Some(amount_cents) = update.amount_cents {
            require_positive(amount_cents, "Amount")?;
            tx.amount_cents = amount_cents;
        }
        if let Some(name) = &update.account {
            tx.account_id = self.usable_account(name).await?.id;
        }
        match update.category {
            Some(Some(name)) => tx.category_id = Some(self.usable_category(&name, tx.kind).await?.id),
            Some(None) => tx.category_id = None,
            None => {
                // Kept category must still agree with a possibly changed kind.
                if let Some(category_id) = tx.category_id {
                    if let Some(category) = self.repo.get_category(category_id).await? {
                        if category.kind != tx.kind {
                            return Err(AppError::CategoryKindMismatch {
                                category: category.name,
                                category_kind: category.kind,
                                requested: tx.kind,
                            });
                        }
                    }
                }
            }
        }
        if let Some(description) = update.description {
            tx.description = description;
        }
        if let Some(occurred_at) = update.occurred_at {
            tx.occurred_at = occurred_at;
        }
        if let Some(recurrence) = update.recurrence {
            tx.recurrence = recurrence;
        }

        self.repo.update_transaction(&tx).await?;
        info!(id = %tx.id, "transaction updated");
        self.details_of(id).await
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<TransactionDetails, AppError> {
        let details = self.details_of(id).await?;
        self.repo.delete_transaction(id).await?;
        info!(id = %id, "transaction deleted");
        Ok(details)
    }

    // ========================
    // Budget operations
    // ========================

    async fn budget_category(&self, name: &str) -> Result<Category, AppError> {
        let category = self.get_category(name).await?;
        if category.kind != EntryKind::Expense {
            return Err(AppError::CategoryKindMismatch {
                category: category.name,
                category_kind: category.kind,
                requested: EntryKind::Expense,
            });
        }
        Ok(category)
    }

    /// Set the spending limit of an expense category for a month,
    /// replacing any existing limit.
    pub async fn set_budget(
        &self,
        category: &str,
        month: YearMonth,
        amount_cents: Cents,
    ) -> Result<Budget, AppError> {
        require_positive(amount_cents, "Budget amount")?;
        let category = self.budget_category(category).await?;

        let budget = self
            .repo
            .upsert_budget(&Budget::new(category.id, month, amount_cents))
            .await?;
        info!(category = %category.name, %month, amount = %format_cents(amount_cents), "budget set");
        Ok(budget)
    }

    pub async fn get_budget(&self, category: &str, month: YearMonth) -> Result<Budget, AppError> {
        let cat = self.get_category(category).await?;
        self.repo
            .get_budget(cat.id, month)
            .await?
            .ok_or_else(|| AppError::BudgetNotFound {
                category: cat.name,
                month,
            })
    }

    pub async fn delete_budget(&self, category: &str, month: YearMonth) -> Result<Budget, AppError> {
        let budget = self.get_budget(category, month).await?;
        self.repo.delete_budget(budget.id).await?;
        info!(category, %month, "budget deleted");
        Ok(budget)
    }

    pub async fn budgets_for_month(&self, month: YearMonth) -> Result<Vec<Budget>, AppError> {
        Ok(self.repo.list_budgets_for_month(month).await?)
    }

    /// Budget history of one category, newest month first.
    pub async fn budgets_for_category(&self, category: &str) -> Result<Vec<Budget>, AppError> {
        let cat = self.get_category(category).await?;
        Ok(self.repo.list_budgets_for_category(cat.id).await?)
    }

    pub async fn list_all_budgets(&self) -> Result<Vec<Budget>, AppError> {
        Ok(self.repo.list_all_budgets().await?)
    }

    /// Budget versus actual spending for every budget of the month.
    pub async fn budget_progress(&self, month: YearMonth) -> Result<Vec<BudgetProgress>, AppError> {
        Ok(self.repo.budget_progress(month).await?)
    }

    /// Budgets whose spending went over the limit, worst first.
    pub async fn exceeded_budgets(&self, month: YearMonth) -> Result<Vec<BudgetProgress>, AppError> {
        let mut exceeded: Vec<_> = self
            .budget_progress(month)
            .await?
            .into_iter()
            .filter(BudgetProgress::is_exceeded)
            .collect();
        exceeded.sort_by_key(|p| std::cmp::Reverse(p.overspent()));
        Ok(exceeded)
    }

    /// Budget minus spending for one category; negative when overspent.
    /// `None` when the category has no budget that month.
    pub async fn remaining_budget(
        &self,
        category: &str,
        month: YearMonth,
    ) -> Result<Option<Cents>, AppError> {
        let cat = self.get_category(category).await?;
        Ok(self
            .budget_progress(month)
            .await?
            .into_iter()
            .find(|p| p.budget.category_id == cat.id)
            .map(|p| p.budget.amount_cents - p.spent_cents))
    }

    pub async fn total_budget(&self, month: YearMonth) -> Result<Cents, AppError> {
        Ok(self.repo.total_budget(month).await?)
    }

    /// Copy all budgets of `from` into `to`. Returns how many were copied.
    pub async fn copy_budgets(&self, from: YearMonth, to: YearMonth) -> Result<usize, AppError> {
        let copied = self.repo.copy_budgets(from, to).await?;
        info!(%from, %to, copied, "budgets copied");
        Ok(copied)
    }

    pub async fn budget_statistics(&self, year: i32) -> Result<Vec<BudgetStatistics>, AppError> {
        Ok(self.repo.budget_statistics(year).await?)
    }

    // ========================
    // Savings goal operations
    // ========================

    fn validate_goal(goal: &SavingsGoal) -> Result<(), AppError> {
        require_positive(goal.target_cents, "Goal target")?;
        if goal.current_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Saved amount cannot be negative".to_string(),
            ));
        }
        if goal.current_cents > goal.target_cents {
            return Err(AppError::GoalOverfunded {
                name: goal.name.clone(),
                current: goal.current_cents,
                target: goal.target_cents,
            });
        }
        Ok(())
    }

    pub async fn create_goal(
        &self,
        name: String,
        target_cents: Cents,
        current_cents: Cents,
        description: Option<String>,
        target_date: Option<chrono::NaiveDate>,
    ) -> Result<SavingsGoal, AppError> {
        if self.repo.get_goal_by_name(&name).await?.is_some() {
            return Err(AppError::GoalAlreadyExists(name));
        }

        let mut goal = SavingsGoal::new(name, target_cents).with_current(current_cents);
        if let Some(description) = description {
            goal = goal.with_description(description);
        }
        if let Some(date) = target_date {
            goal = goal.with_target_date(date);
        }
        Self::validate_goal(&goal)?;

        self.repo.save_goal(&goal).await?;
        info!(goal = %goal.name, target = %format_cents(goal.target_cents), "savings goal created");
        Ok(goal)
    }

    pub async fn get_goal(&self, name: &str) -> Result<SavingsGoal, AppError> {
        self.repo
            .get_goal_by_name(name)
            .await?
            .ok_or_else(|| AppError::GoalNotFound(name.to_string()))
    }

    /// Goals in progress first, then newest first.
    pub async fn list_goals(&self) -> Result<Vec<SavingsGoal>, AppError> {
        Ok(self.repo.list_goals().await?)
    }

    pub async fn update_goal(&self, name: &str, update: GoalUpdate) -> Result<SavingsGoal, AppError> {
        let mut goal = self.get_goal(name).await?;

        if let Some(new_name) = update.name {
            if new_name != goal.name && self.repo.get_goal_by_name(&new_name).await?.is_some() {
                return Err(AppError::GoalAlreadyExists(new_name));
            }
            goal.name = new_name;
        }
        if let Some(target) = update.target_cents {
            goal.target_cents = target;
        }
        if let Some(current) = update.current_cents {
            goal.current_cents = current;
        }
        if let Some(description) = update.description {
            goal.description = description;
        }
        if let Some(date) = update.target_date {
            goal.target_date = date;
        }
        goal.refresh_completion();
        Self::validate_goal(&goal)?;

        self.repo.update_goal(&goal).await?;
        debug!(goal = %goal.name, "savings goal updated");
        Ok(goal)
    }

    /// Add money to a goal. The total may reach but not pass the target.
    pub async fn contribute(&self, name: &str, amount_cents: Cents) -> Result<SavingsGoal, AppError> {
        require_positive(amount_cents, "Contribution")?;
        let mut goal = self.get_goal(name).await?;

        let new_current = goal
            .current_cents
            .checked_add(amount_cents)
            .ok_or_else(|| AppError::InvalidAmount("Contribution overflows the saved amount".into()))?;
        if new_current > goal.target_cents {
            return Err(AppError::GoalOverfunded {
                name: goal.name,
                current: new_current,
                target: goal.target_cents,
            });
        }
        goal.current_cents = new_current;
        goal.refresh_completion();

        self.repo.update_goal(&goal).await?;
        info!(goal = %goal.name, amount = %format_cents(amount_cents), completed = goal.is_completed, "contribution added");
        Ok(goal)
    }

    pub async fn withdraw(&self, name: &str, amount_cents: Cents) -> Result<SavingsGoal, AppError> {
        require_positive(amount_cents, "Withdrawal")?;
        let mut goal = self.get_goal(name).await?;

        if amount_cents > goal.current_cents {
            return Err(AppError::GoalUnderfunded {
                name: goal.name,
                current: goal.current_cents,
                requested: amount_cents,
            });
        }
        goal.current_cents -= amount_cents;
        goal.refresh_completion();

        self.repo.update_goal(&goal).await?;
        info!(goal = %goal.name, amount = %format_cents(amount_cents), "withdrawal recorded");
        Ok(goal)
    }

    pub async fn delete_goal(&self, name: &str) -> Result<SavingsGoal, AppError> {
        let goal = self.get_goal(name).await?;
        self.repo.delete_goal(goal.id).await?;
        info!(goal = %goal.name, "savings goal deleted");
        Ok(goal)
    }

    /// Totals over goals that are still in progress.
    pub async fn goal_totals(&self) -> Result<GoalTotals, AppError> {
        Ok(self.repo.goal_totals().await?)
    }

    pub async fn savings_overview(&self) -> Result<SavingsOverview, AppError> {
        Ok(self.goal_totals().await?.into())
    }

    // ========================
    // Template operations
    // ========================

    pub async fn create_template(
        &self,
        name: String,
        kind: EntryKind,
        amount_cents: Cents,
        account: Option<String>,
        category: Option<String>,
        description: Option<String>,
    ) -> Result<Template, AppError> {
        require_positive(amount_cents, "Template amount")?;
        if self.repo.get_template_by_name(&name).await?.is_some() {
            return Err(AppError::TemplateAlreadyExists(name));
        }

        let mut template = Template::new(name, kind, amount_cents);
        if let Some(account) = account {
            template.account_id = Some(self.get_account(&account).await?.id);
        }
        if let Some(category) = category {
            template.category_id = Some(self.usable_category(&category, kind).await?.id);
        }
        template.description = description;

        self.repo.save_template(&template).await?;
        info!(template = %template.name, "template created");
        Ok(template)
    }

    pub async fn get_template(&self, name: &str) -> Result<Template, AppError> {
        self.repo
            .get_template_by_name(name)
            .await?
            .ok_or_else(|| AppError::TemplateNotFound(name.to_string()))
    }

    pub async fn list_templates(&self) -> Result<Vec<Template>, AppError> {
        Ok(self.repo.list_templates().await?)
    }

    pub async fn delete_template(&self, name: &str) -> Result<Template, AppError> {
        let template = self.get_template(name).await?;
        self.repo.delete_template(template.id).await?;
        info!(template = %template.name, "template deleted");
        Ok(template)
    }

    /// Record a transaction from a template. `account` and `amount_cents`
    /// override what the template stores. The date defaults to now.
    pub async fn apply_template(
        &self,
        name: &str,
        account: Option<String>,
        amount_cents: Option<Cents>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Result<TransactionDetails, AppError> {
        let template = self.get_template(name).await?;

        let account = match account {
            Some(account) => account,
            None => {
                let id = template
                    .account_id
                    .ok_or_else(|| AppError::TemplateWithoutAccount(template.name.clone()))?;
                self.repo
                    .get_account(id)
                    .await?
                    .ok_or_else(|| AppError::AccountNotFound(id.to_string()))?
                    .name
            }
        };
        let category = match template.category_id {
            Some(id) => self.repo.get_category(id).await?.map(|c| c.name),
            None => None,
        };

        self.record_transaction(NewTransaction {
            account,
            kind: template.kind,
            amount_cents: amount_cents.unwrap_or(template.amount_cents),
            category,
            description: template.description.clone(),
            occurred_at: occurred_at.unwrap_or_else(Utc::now),
            recurrence: None,
        })
        .await
    }

    // ========================
    // Reporting
    // ========================

    /// Income, expense, balance and spending by category for one month.
    pub async fn monthly_summary(&self, month: YearMonth) -> Result<MonthlySummary, AppError> {
        let (from, to) = month.bounds();
        let totals = self.repo.totals_by_kind(from, to).await?;
        let by_category = self.repo.sum_by_category(EntryKind::Expense, from, to).await?;
        let (expense_by_category, _) = summarize_categories(by_category);

        Ok(MonthlySummary {
            month,
            total_income: totals.income,
            total_expense: totals.expense,
            balance: totals.income - totals.expense,
            expense_by_category,
        })
    }

    /// Per-category totals of one kind over `[from, to)`.
    pub async fn category_report(
        &self,
        kind: EntryKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CategoryReport, AppError> {
        let (categories, total) = summarize_categories(self.repo.sum_by_category(kind, from, to).await?);
        Ok(CategoryReport {
            from_date: from,
            to_date: to,
            kind,
            categories,
            total,
        })
    }

    /// Income and expense for each month of a year, empty months included.
    pub async fn monthly_trend(&self, year: i32) -> Result<MonthlyTrend, AppError> {
        let totals = self.repo.monthly_totals(year).await?;

        let months: Vec<MonthTotals> = YearMonth::months_of(year)?
            .into_iter()
            .map(|month| {
                let t = totals.get(&month.month()).copied().unwrap_or_default();
                MonthTotals {
                    month,
                    income: t.income,
                    expense: t.expense,
                    net: t.income - t.expense,
                }
            })
            .collect();

        Ok(MonthlyTrend {
            year,
            total_income: months.iter().map(|m| m.income).sum(),
            total_expense: months.iter().map(|m| m.expense).sum(),
            months,
        })
    }

    // ========================
    // Settings & seeding
    // ========================

    pub async fn settings(&self) -> Result<UserSettings, AppError> {
        Ok(self.repo.get_settings().await?)
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<UserSettings, AppError> {
        let mut settings = self.repo.get_settings().await?;
        if let Some(currency) = update.currency {
            settings.currency = currency;
        }
        if let Some(income) = update.monthly_income_cents {
            if income < 0 {
                return Err(AppError::InvalidAmount("Monthly income cannot be negative".into()));
            }
            settings.monthly_income_cents = income;
        }
        if let Some(target) = update.savings_target_cents {
            if target < 0 {
                return Err(AppError::InvalidAmount("Savings target cannot be negative".into()));
            }
            settings.savings_target_cents = target;
        }

        self.repo.save_settings(&settings).await?;
        debug!(currency = %settings.currency, "settings updated");
        Ok(settings)
    }

    /// Insert the default categories and accounts into an empty database.
    /// Returns false (and changes nothing) when categories already exist.
    pub async fn seed_defaults(&self) -> Result<bool, AppError> {
        if self.repo.count_categories().await? > 0 {
            debug!("categories present, skipping default data");
            return Ok(false);
        }

        let categories = default_categories();
        let mut accounts = Vec::new();
        if self.repo.count_accounts().await? == 0 {
            let currency = self.repo.get_settings().await?.currency;
            let defaults = [
                ("Cash", "#32D74B", "banknote"),
                ("Main card", "#0A84FF", "creditcard"),
                ("Savings", "#FF453A", "building.columns"),
            ];
            for (i, (name, color, icon)) in defaults.into_iter().enumerate() {
                accounts.push(
                    Account::new(name.to_string(), currency.clone())
                        .with_color(color)
                        .with_icon(icon)
                        .with_sort_order(i as i64 + 1),
                );
            }
        }

        self.repo.seed(&categories, &accounts).await?;

        info!("default categories and accounts added");
        Ok(true)
    }
}
