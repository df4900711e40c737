use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{
    AccountUpdate, CategorySummary, CategoryUpdate, FinanceService, GoalUpdate, MonthlyTrend,
    NewTransaction, SavingsOverview, SettingsUpdate, TransactionFilter, TransactionUpdate,
};
use crate::domain::{EntryKind, Recurrence, YearMonth, format_cents, parse_cents};

/// Fintrack - Personal Income & Expense Tracker
#[derive(Parser)]
#[command(name = "fintrack")]
#[command(about = "A local-first tracker for income, expenses, budgets and savings goals")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FINTRACK_DB", default_value = "fintrack.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Add the default categories and accounts
        #[arg(long)]
        with_defaults: bool,
    },

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Record income
    Income(EntryArgs),

    /// Record an expense
    Expense(EntryArgs),

    /// List transactions, newest first
    Transactions {
        /// Filter by account name
        #[arg(long)]
        account: Option<String>,

        /// Filter by category name
        #[arg(long)]
        category: Option<String>,

        /// Filter by type: income or expense
        #[arg(short = 't', long = "type")]
        kind: Option<EntryKind>,

        /// Only this month (YYYY-MM); overrides --from-date/--to-date
        #[arg(short, long)]
        month: Option<YearMonth>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show detailed transaction information
    Show {
        /// Transaction ID
        id: String,
    },

    /// Change a transaction
    Edit {
        /// Transaction ID
        id: String,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// Move to another account
        #[arg(long)]
        account: Option<String>,

        /// Change type: income or expense
        #[arg(short = 't', long = "type")]
        kind: Option<EntryKind>,

        /// New category
        #[arg(short, long, conflicts_with = "no_category")]
        category: Option<String>,

        /// Remove the category
        #[arg(long)]
        no_category: bool,

        /// New description (empty string removes it)
        #[arg(short, long)]
        description: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New recurrence: daily, weekly, monthly, yearly
        #[arg(short, long, conflicts_with = "no_recurrence")]
        recurrence: Option<Recurrence>,

        /// Remove the recurrence
        #[arg(long)]
        no_recurrence: bool,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },

    /// Budget management commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Savings goal commands
    #[command(subcommand)]
    Goal(GoalCommands),

    /// Transaction template commands
    #[command(subcommand)]
    Template(TemplateCommands),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Show or change user settings
    #[command(subcommand)]
    Settings(SettingsCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, accounts, budgets, goals, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Month for budget exports (YYYY-MM, defaults to current)
        #[arg(short, long)]
        month: Option<YearMonth>,
    },
}

/// Arguments shared by `income` and `expense`.
#[derive(clap::Args)]
pub struct EntryArgs {
    /// Amount (e.g., "50.00" or "50")
    pub amount: String,

    /// Account name
    #[arg(short, long)]
    pub account: String,

    /// Category name
    #[arg(short, long)]
    pub category: Option<String>,

    /// Description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Date (YYYY-MM-DD, defaults to now)
    #[arg(long)]
    pub date: Option<String>,

    /// How often it repeats: daily, weekly, monthly, yearly
    #[arg(short, long)]
    pub recurrence: Option<Recurrence>,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Create {
        /// Account name (must be unique)
        name: String,

        /// Currency code (defaults to the settings currency)
        #[arg(short, long)]
        currency: Option<String>,

        /// Opening balance
        #[arg(short, long, allow_hyphen_values = true)]
        opening_balance: Option<String>,
    },

    /// List accounts with balances
    List {
        /// Include archived accounts
        #[arg(short, long)]
        all: bool,
    },

    /// Show account details
    Show { name: String },

    /// Change account properties
    Edit {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(short, long)]
        currency: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        sort_order: Option<i64>,
    },

    /// Correct the balance without recording a transaction
    Adjust {
        name: String,

        /// Signed amount to add (e.g., "-12.50")
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },

    /// Archive an account (hide it and block new transactions)
    Archive { name: String },

    /// Delete an account and all its transactions
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Create {
        /// Category name (must be unique)
        name: String,

        /// Category type: income or expense
        #[arg(short = 't', long = "type")]
        kind: EntryKind,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,
    },

    /// List categories
    List {
        /// Only this type: income or expense
        #[arg(short = 't', long = "type")]
        kind: Option<EntryKind>,

        /// Include archived categories
        #[arg(short, long)]
        all: bool,
    },

    /// Change category properties
    Edit {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        #[arg(long)]
        sort_order: Option<i64>,
    },

    /// Archive a category
    Archive { name: String },

    /// Delete a category (its transactions become uncategorized)
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set the monthly limit of an expense category
    Set {
        /// Expense category name
        category: String,

        /// Limit amount (e.g., "400.00")
        amount: String,

        /// Month (YYYY-MM, defaults to current)
        #[arg(short, long)]
        month: Option<YearMonth>,
    },

    /// Show budgets with spending for a month
    List {
        #[arg(short, long)]
        month: Option<YearMonth>,
    },

    /// Show what is left of one category's budget
    Remaining {
        category: String,

        #[arg(short, long)]
        month: Option<YearMonth>,
    },

    /// Show every monthly budget of a category
    History {
        category: String,
    },

    /// Delete a budget
    Delete {
        category: String,

        #[arg(short, long)]
        month: Option<YearMonth>,
    },

    /// Copy all budgets from one month to another
    Copy {
        /// Source month (YYYY-MM)
        from: YearMonth,

        /// Target month (YYYY-MM)
        to: YearMonth,
    },

    /// List budgets that went over their limit
    Exceeded {
        #[arg(short, long)]
        month: Option<YearMonth>,
    },

    /// Budget totals per month for a year
    Stats {
        /// Year (defaults to current)
        #[arg(short, long)]
        year: Option<i32>,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a savings goal
    Create {
        /// Goal name (must be unique)
        name: String,

        /// Target amount
        target: String,

        /// Amount already saved
        #[arg(long)]
        current: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// List savings goals
    List,

    /// Show goal details
    Show { name: String },

    /// Change a savings goal
    Edit {
        name: String,

        #[arg(long)]
        rename: Option<String>,

        #[arg(long)]
        target: Option<String>,

        #[arg(long)]
        current: Option<String>,

        /// New description (empty string removes it)
        #[arg(short, long)]
        description: Option<String>,

        /// New target date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "no_date")]
        date: Option<String>,

        /// Remove the target date
        #[arg(long)]
        no_date: bool,
    },

    /// Add money to a goal
    Contribute { name: String, amount: String },

    /// Take money out of a goal
    Withdraw { name: String, amount: String },

    /// Delete a savings goal
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Save a reusable transaction template
    Create {
        /// Template name (must be unique)
        name: String,

        /// Type: income or expense
        #[arg(short = 't', long = "type")]
        kind: EntryKind,

        /// Amount
        amount: String,

        #[arg(short, long)]
        account: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// List templates
    List,

    /// Record a transaction from a template
    Apply {
        name: String,

        /// Account to use instead of the template's
        #[arg(short, long)]
        account: Option<String>,

        /// Amount to use instead of the template's
        #[arg(long)]
        amount: Option<String>,

        /// Date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a template
    Delete { name: String },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income, expenses and spending by category for one month
    Summary {
        /// Month (YYYY-MM, defaults to current)
        #[arg(short, long)]
        month: Option<YearMonth>,

        /// Output format: table, json, csv
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Totals by category for a date range
    Categories {
        /// Type: income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: EntryKind,

        /// Start date (YYYY-MM-DD, defaults to start of month)
        #[arg(long)]
        from: Option<String>,

        /// End date, inclusive (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        to: Option<String>,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Income and expense for each month of a year
    Trend {
        /// Year (defaults to current)
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Progress over all active savings goals
    Savings {
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Change settings
    Set {
        /// Default currency for new accounts
        #[arg(short, long)]
        currency: Option<String>,

        /// Expected monthly income
        #[arg(long)]
        monthly_income: Option<String>,

        /// Monthly savings target
        #[arg(long)]
        savings_target: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init { with_defaults } => {
                let service = FinanceService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
                if with_defaults {
                    if service.seed_defaults().await? {
                        println!("Added default categories and accounts");
                    } else {
                        println!("Categories already exist, defaults skipped");
                    }
                }
            }

            command => {
                let service = FinanceService::connect(&self.database).await.with_context(|| {
                    format!(
                        "Failed to open database '{}'. Run `fintrack init` first",
                        self.database
                    )
                })?;
                run_command(&service, command).await?;
            }
        }

        Ok(())
    }
}

async fn run_command(service: &FinanceService, command: Commands) -> Result<()> {
    match command {
        Commands::Init { .. } => {
            anyhow::bail!("init does not take an open database");
        }
        Commands::Account(cmd) => run_account_command(service, cmd).await?,
        Commands::Category(cmd) => run_category_command(service, cmd).await?,
        Commands::Income(args) => run_entry_command(service, EntryKind::Income, args).await?,
        Commands::Expense(args) => run_entry_command(service, EntryKind::Expense, args).await?,

        Commands::Transactions {
            account,
            category,
            kind,
            month,
            from_date,
            to_date,
            limit,
        } => {
            let (from_date, to_date) = match month {
                Some(month) => {
                    let (from, to) = month.bounds();
                    (Some(from), Some(to))
                }
                None => (
                    from_date
                        .map(|s| parse_date(&s))
                        .transpose()
                        .context("Invalid from-date")?,
                    to_date
                        .map(|s| parse_date_end(&s))
                        .transpose()
                        .context("Invalid to-date")?,
                ),
            };

            let filter = TransactionFilter {
                account,
                category,
                kind,
                from_date,
                to_date,
                limit,
            };
            run_transactions_command(service, filter).await?;
        }

        Commands::Show { id } => {
            let details = service.get_transaction_details(parse_id(&id)?).await?;
            let tx = &details.transaction;

            println!("Transaction: {}", tx.id);
            println!("  Type:        {}", tx.kind);
            println!("  Amount:      {}", format_cents(tx.amount_cents));
            println!("  Account:     {}", details.account_name);
            println!(
                "  Category:    {}",
                details.category_name.as_deref().unwrap_or("-")
            );
            println!("  Date:        {}", tx.occurred_at.format("%Y-%m-%d"));
            println!("  Recorded:    {}", tx.recorded_at.format("%Y-%m-%d %H:%M:%S"));
            if let Some(desc) = &tx.description {
                println!("  Description: {}", desc);
            }
            if let Some(recurrence) = tx.recurrence {
                println!("  Repeats:     {}", recurrence);
            }
        }

        Commands::Edit {
            id,
            amount,
            account,
            kind,
            category,
            no_category,
            description,
            date,
            recurrence,
            no_recurrence,
        } => {
            let update = TransactionUpdate {
                account,
                kind,
                amount_cents: amount.as_deref().map(parse_amount).transpose()?,
                category: if no_category { Some(None) } else { category.map(Some) },
                description: description.map(|d| Some(d).filter(|d| !d.is_empty())),
                occurred_at: date.as_deref().map(parse_date).transpose()?,
                recurrence: if no_recurrence { Some(None) } else { recurrence.map(Some) },
            };

            let details = service.update_transaction(parse_id(&id)?, update).await?;
            println!(
                "Updated {}: {} {} ({})",
                details.transaction.kind,
                format_cents(details.transaction.amount_cents),
                details.account_name,
                details.transaction.id
            );
        }

        Commands::Delete { id } => {
            let details = service.delete_transaction(parse_id(&id)?).await?;
            println!(
                "Deleted {}: {} {}",
                details.transaction.kind,
                format_cents(details.transaction.amount_cents),
                details.account_name
            );
        }

        Commands::Budget(cmd) => run_budget_command(service, cmd).await?,
        Commands::Goal(cmd) => run_goal_command(service, cmd).await?,
        Commands::Template(cmd) => run_template_command(service, cmd).await?,
        Commands::Report(cmd) => run_report_command(service, cmd).await?,
        Commands::Settings(cmd) => run_settings_command(service, cmd).await?,

        Commands::Export {
            export_type,
            output,
            month,
        } => {
            run_export_command(service, &export_type, output.as_deref(), month).await?;
        }
    }

    Ok(())
}

async fn run_entry_command(service: &FinanceService, kind: EntryKind, args: EntryArgs) -> Result<()> {
    let amount_cents = parse_amount(&args.amount)?;
    let occurred_at = match args.date {
        Some(date_str) => parse_date(&date_str)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))?,
        None => Utc::now(),
    };

    let details = service
        .record_transaction(NewTransaction {
            account: args.account,
            kind,
            amount_cents,
            category: args.category,
            description: args.description,
            occurred_at,
            recurrence: args.recurrence,
        })
        .await?;

    println!(
        "Recorded {}: {} {}{} ({})",
        kind,
        format_cents(details.transaction.amount_cents),
        details.account_name,
        details
            .category_name
            .map(|c| format!(" [{}]", c))
            .unwrap_or_default(),
        details.transaction.id
    );
    Ok(())
}

async fn run_account_command(service: &FinanceService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            name,
            currency,
            opening_balance,
        } => {
            let opening = opening_balance
                .as_deref()
                .map(parse_signed_amount)
                .transpose()?
                .unwrap_or(0);
            let account = service.create_account(name, currency, opening).await?;
            println!(
                "Created account: {} ({}, opening balance {})",
                account.name,
                account.currency,
                format_cents(account.opening_balance_cents)
            );
        }

        AccountCommands::List { all } => {
            let summaries = service.all_account_summaries().await?;
            let mut archived = Vec::new();
            if all {
                archived = service
                    .list_accounts(true)
                    .await?
                    .into_iter()
                    .filter(|a| !a.is_active)
                    .collect();
            }

            if summaries.is_empty() && archived.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<20} {:>12} {:<8}", "ACCOUNT", "BALANCE", "CURRENCY");
                println!("{}", "-".repeat(44));
                for summary in &summaries {
                    println!(
                        "{:<20} {:>12} {:<8}",
                        truncate(&summary.account.name, 20),
                        format_cents(summary.balance),
                        summary.account.currency
                    );
                }
                for account in &archived {
                    println!(
                        "{:<20} {:>12} {:<8}",
                        truncate(&account.name, 20),
                        "(archived)",
                        account.currency
                    );
                }
            }
        }

        AccountCommands::Show { name } => {
            let summary = service.account_summary(&name).await?;
            let account = &summary.account;

            println!("Account: {}", account.name);
            println!("  ID:              {}", account.id);
            println!("  Currency:        {}", account.currency);
            println!("  Active:          {}", if account.is_active { "yes" } else { "no" });
            println!(
                "  Created:         {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Opening balance: {}", format_cents(account.opening_balance_cents));
            println!("  Income:          {}", format_cents(summary.total_income));
            println!("  Expenses:        {}", format_cents(summary.total_expense));
            println!(
                "  Balance:         {} {}",
                format_cents(summary.balance),
                account.currency
            );
            println!("  Transactions:    {}", summary.transaction_count);
        }

        AccountCommands::Edit {
            name,
            rename,
            currency,
            color,
            icon,
            sort_order,
        } => {
            let account = service
                .update_account(
                    &name,
                    AccountUpdate {
                        name: rename,
                        currency,
                        color,
                        icon,
                        sort_order,
                    },
                )
                .await?;
            println!("Updated account: {}", account.name);
        }

        AccountCommands::Adjust { name, amount } => {
            let summary = service
                .adjust_balance(&name, parse_signed_amount(&amount)?)
                .await?;
            println!(
                "{}: balance is now {} {}",
                summary.account.name,
                format_cents(summary.balance),
                summary.account.currency
            );
        }

        AccountCommands::Archive { name } => {
            service.archive_account(&name).await?;
            println!("Archived account: {}", name);
        }

        AccountCommands::Delete { name } => {
            service.delete_account(&name).await?;
            println!("Deleted account: {}", name);
        }
    }
    Ok(())
}

async fn run_category_command(service: &FinanceService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Create {
            name,
            kind,
            color,
            icon,
        } => {
            let category = service.create_category(name, kind, color, icon).await?;
            println!("Created category: {} ({})", category.name, category.kind);
        }

        CategoryCommands::List { kind, all } => {
            let categories = service.list_categories(kind, all).await?;
            if categories.is_empty() {
                println!("No categories found.");
            } else {
                println!("{:<20} {:<8} {:<8} {:<6}", "NAME", "TYPE", "COLOR", "ACTIVE");
                println!("{}", "-".repeat(46));
                for category in categories {
                    println!(
                        "{:<20} {:<8} {:<8} {:<6}",
                        truncate(&category.name, 20),
                        category.kind,
                        category.color,
                        if category.is_active { "yes" } else { "no" }
                    );
                }
            }
        }

        CategoryCommands::Edit {
            name,
            rename,
            color,
            icon,
            sort_order,
        } => {
            let category = service
                .update_category(
                    &name,
                    CategoryUpdate {
                        name: rename,
                        color,
                        icon,
                        sort_order,
                    },
                )
                .await?;
            println!("Updated category: {}", category.name);
        }

        CategoryCommands::Archive { name } => {
            service.archive_category(&name).await?;
            println!("Archived category: {}", name);
        }

        CategoryCommands::Delete { name } => {
            service.delete_category(&name).await?;
            println!("Deleted category: {}", name);
        }
    }
    Ok(())
}

async fn run_transactions_command(service: &FinanceService, filter: TransactionFilter) -> Result<()> {
    let transactions = service.list_transactions(filter).await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<12} {:>11} {:<15} {:<15} DESCRIPTION",
        "DATE", "AMOUNT", "ACCOUNT", "CATEGORY"
    );
    println!("{}", "-".repeat(75));

    for details in &transactions {
        let tx = &details.transaction;
        println!(
            "{:<12} {:>11} {:<15} {:<15} {}",
            tx.occurred_at.format("%Y-%m-%d"),
            format_cents(tx.signed_amount()),
            truncate(&details.account_name, 15),
            truncate(details.category_name.as_deref().unwrap_or("-"), 15),
            truncate(tx.description.as_deref().unwrap_or(""), 30)
        );
    }
    Ok(())
}

async fn run_budget_command(service: &FinanceService, cmd: BudgetCommands) -> Result<()> {
    match cmd {
        BudgetCommands::Set {
            category,
            amount,
            month,
        } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '400.00' or '400'")?;
            let month = month.unwrap_or_else(YearMonth::current);

            let budget = service.set_budget(&category, month, amount_cents).await?;
            println!(
                "Budget set: {} {} for {}",
                category,
                format_cents(budget.amount_cents),
                month
            );
        }

        BudgetCommands::List { month } => {
            let month = month.unwrap_or_else(YearMonth::current);
            let progress = service.budget_progress(month).await?;
            if progress.is_empty() {
                println!("No budgets for {}.", month);
            } else {
                println!("Budgets for {}", month.name());
                println!();
                println!(
                    "{:<20} {:>12} {:>12} {:>12} {:>7}",
                    "CATEGORY", "LIMIT", "SPENT", "REMAINING", "USED"
                );
                println!("{}", "-".repeat(67));
                for p in &progress {
                    println!(
                        "{:<20} {:>12} {:>12} {:>12} {:>6.0}%{}",
                        truncate(&p.category_name, 20),
                        format_cents(p.budget.amount_cents),
                        format_cents(p.spent_cents),
                        format_cents(p.remaining()),
                        p.progress_percent(),
                        if p.is_exceeded() { " !" } else { "" }
                    );
                }
                println!("{}", "-".repeat(67));
                println!(
                    "{:<20} {:>12}",
                    "TOTAL",
                    format_cents(service.total_budget(month).await?)
                );
            }
        }

        BudgetCommands::Remaining { category, month } => {
            let month = month.unwrap_or_else(YearMonth::current);
            match service.remaining_budget(&category, month).await? {
                Some(remaining) if remaining < 0 => {
                    println!("{}: over budget by {} in {}", category, format_cents(-remaining), month)
                }
                Some(remaining) => {
                    println!("{}: {} left in {}", category, format_cents(remaining), month)
                }
                None => println!("{}: no budget for {}", category, month),
            }
        }

        BudgetCommands::History { category } => {
            let budgets = service.budgets_for_category(&category).await?;
            if budgets.is_empty() {
                println!("No budgets for {}", category);
            } else {
                for budget in &budgets {
                    println!("{}  {:>12}", budget.month, format_cents(budget.amount_cents));
                }
            }
        }

        BudgetCommands::Delete { category, month } => {
            let month = month.unwrap_or_else(YearMonth::current);
            service.delete_budget(&category, month).await?;
            println!("Deleted budget: {} ({})", category, month);
        }

        BudgetCommands::Copy { from, to } => {
            let count = service.copy_budgets(from, to).await?;
            println!("Copied {} budgets from {} to {}", count, from, to);
        }

        BudgetCommands::Exceeded { month } => {
            let month = month.unwrap_or_else(YearMonth::current);
            let exceeded = service.exceeded_budgets(month).await?;
            if exceeded.is_empty() {
                println!("No budgets exceeded in {}.", month);
            } else {
                println!("{:<20} {:>12} {:>12} {:>12}", "CATEGORY", "LIMIT", "SPENT", "OVER");
                println!("{}", "-".repeat(59));
                for p in &exceeded {
                    println!(
                        "{:<20} {:>12} {:>12} {:>12}",
                        truncate(&p.category_name, 20),
                        format_cents(p.budget.amount_cents),
                        format_cents(p.spent_cents),
                        format_cents(p.overspent())
                    );
                }
            }
        }

        BudgetCommands::Stats { year } => {
            let year = year.unwrap_or_else(|| YearMonth::current().year());
            let stats = service.budget_statistics(year).await?;
            if stats.is_empty() {
                println!("No budgets in {}.", year);
            } else {
                println!(
                    "{:<9} {:>12} {:>12} {:>12} {:>7}",
                    "MONTH", "BUDGET", "SPENT", "REMAINING", "USED"
                );
                println!("{}", "-".repeat(56));
                for s in &stats {
                    println!(
                        "{:<9} {:>12} {:>12} {:>12} {:>6.0}%",
                        s.month.to_string(),
                        format_cents(s.total_budget),
                        format_cents(s.total_spent),
                        format_cents(s.remaining()),
                        s.progress_percent()
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_goal_command(service: &FinanceService, cmd: GoalCommands) -> Result<()> {
    match cmd {
        GoalCommands::Create {
            name,
            target,
            current,
            description,
            date,
        } => {
            let target_cents = parse_amount(&target)?;
            let current_cents = current.as_deref().map(parse_cents).transpose()?.unwrap_or(0);
            let target_date = date.as_deref().map(parse_day).transpose()?;

            let goal = service
                .create_goal(name, target_cents, current_cents, description, target_date)
                .await?;
            println!(
                "Created savings goal: {} ({} of {})",
                goal.name,
                format_cents(goal.current_cents),
                format_cents(goal.target_cents)
            );
        }

        GoalCommands::List => {
            let goals = service.list_goals().await?;
            if goals.is_empty() {
                println!("No savings goals found.");
            } else {
                let today = Utc::now().date_naive();
                println!(
                    "{:<20} {:>12} {:>12} {:>5} {:<12}",
                    "GOAL", "SAVED", "TARGET", "%", "DUE"
                );
                println!("{}", "-".repeat(65));
                for goal in &goals {
                    let due = match goal.days_left(today) {
                        _ if goal.is_completed => "done".to_string(),
                        Some(days) if days < 0 => format!("{}d overdue", -days),
                        Some(days) => format!("{}d left", days),
                        None => "-".to_string(),
                    };
                    println!(
                        "{:<20} {:>12} {:>12} {:>4}% {:<12}",
                        truncate(&goal.name, 20),
                        format_cents(goal.current_cents),
                        format_cents(goal.target_cents),
                        goal.progress_percent(),
                        due
                    );
                }
            }
        }

        GoalCommands::Show { name } => {
            let goal = service.get_goal(&name).await?;
            let today = Utc::now().date_naive();

            println!("Savings goal: {}", goal.name);
            if let Some(desc) = &goal.description {
                println!("  Description: {}", desc);
            }
            println!("  Saved:       {}", format_cents(goal.current_cents));
            println!("  Target:      {}", format_cents(goal.target_cents));
            println!("  Remaining:   {}", format_cents(goal.remaining()));
            println!("  Progress:    {}%", goal.progress_percent());
            if let Some(date) = goal.target_date {
                println!("  Target date: {}", date);
            }
            if goal.is_completed {
                println!("  Status:      completed");
            } else if let Some(monthly) = goal.required_monthly(today) {
                println!("  Needed:      {} per month", format_cents(monthly));
            }
        }

        GoalCommands::Edit {
            name,
            rename,
            target,
            current,
            description,
            date,
            no_date,
        } => {
            let update = GoalUpdate {
                name: rename,
                target_cents: target.as_deref().map(parse_amount).transpose()?,
                current_cents: current.as_deref().map(parse_cents).transpose()?,
                description: description.map(|d| Some(d).filter(|d| !d.is_empty())),
                target_date: if no_date {
                    Some(None)
                } else {
                    date.as_deref().map(parse_day).transpose()?.map(Some)
                },
            };
            let goal = service.update_goal(&name, update).await?;
            println!("Updated savings goal: {}", goal.name);
        }

        GoalCommands::Contribute { name, amount } => {
            let goal = service.contribute(&name, parse_amount(&amount)?).await?;
            println!(
                "{}: {} of {} ({}%){}",
                goal.name,
                format_cents(goal.current_cents),
                format_cents(goal.target_cents),
                goal.progress_percent(),
                if goal.is_completed { " - goal reached!" } else { "" }
            );
        }

        GoalCommands::Withdraw { name, amount } => {
            let goal = service.withdraw(&name, parse_amount(&amount)?).await?;
            println!(
                "{}: {} of {} ({}%)",
                goal.name,
                format_cents(goal.current_cents),
                format_cents(goal.target_cents),
                goal.progress_percent()
            );
        }

        GoalCommands::Delete { name } => {
            service.delete_goal(&name).await?;
            println!("Deleted savings goal: {}", name);
        }
    }
    Ok(())
}

async fn run_template_command(service: &FinanceService, cmd: TemplateCommands) -> Result<()> {
    match cmd {
        TemplateCommands::Create {
            name,
            kind,
            amount,
            account,
            category,
            description,
        } => {
            let template = service
                .create_template(name, kind, parse_amount(&amount)?, account, category, description)
                .await?;
            println!(
                "Created template: {} ({} {})",
                template.name,
                template.kind,
                format_cents(template.amount_cents)
            );
        }

        TemplateCommands::List => {
            let templates = service.list_templates().await?;
            if templates.is_empty() {
                println!("No templates found.");
            } else {
                println!("{:<20} {:<8} {:>12} DESCRIPTION", "NAME", "TYPE", "AMOUNT");
                println!("{}", "-".repeat(60));
                for template in templates {
                    println!(
                        "{:<20} {:<8} {:>12} {}",
                        truncate(&template.name, 20),
                        template.kind,
                        format_cents(template.amount_cents),
                        truncate(template.description.as_deref().unwrap_or(""), 30)
                    );
                }
            }
        }

        TemplateCommands::Apply {
            name,
            account,
            amount,
            date,
        } => {
            let amount_cents = amount.as_deref().map(parse_amount).transpose()?;
            let occurred_at = date.as_deref().map(parse_date).transpose()?;

            let details = service
                .apply_template(&name, account, amount_cents, occurred_at)
                .await?;
            println!(
                "Recorded {}: {} {} ({})",
                details.transaction.kind,
                format_cents(details.transaction.amount_cents),
                details.account_name,
                details.transaction.id
            );
        }

        TemplateCommands::Delete { name } => {
            service.delete_template(&name).await?;
            println!("Deleted template: {}", name);
        }
    }
    Ok(())
}

async fn run_report_command(service: &FinanceService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Summary { month, format } => {
            let month = month.unwrap_or_else(YearMonth::current);
            let summary = service.monthly_summary(month).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                "csv" => write_category_csv(std::io::stdout(), &summary.expense_by_category)?,
                _ => {
                    println!("Summary for {}", month.name());
                    println!();
                    println!("  Income:   {:>12}", format_cents(summary.total_income));
                    println!("  Expenses: {:>12}", format_cents(summary.total_expense));
                    println!("  Balance:  {:>12}", format_cents(summary.balance));

                    if !summary.expense_by_category.is_empty() {
                        println!();
                        println!("{:<20} {:>12} {:>8}", "CATEGORY", "SPENT", "PERCENT");
                        println!("{}", "-".repeat(42));
                        for cat in &summary.expense_by_category {
                            println!(
                                "{:<20} {:>12} {:>7.1}%",
                                truncate(&cat.category, 20),
                                format_cents(cat.total),
                                cat.percentage
                            );
                        }
                    }
                }
            }
        }

        ReportCommands::Categories {
            kind,
            from,
            to,
            format,
        } => {
            let (from_date, to_date) = parse_date_range(from, to)?;
            let report = service.category_report(kind, from_date, to_date).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "csv" => write_category_csv(std::io::stdout(), &report.categories)?,
                _ => {
                    println!("Category Report ({})", kind);
                    println!(
                        "Period: {} to {}",
                        from_date.format("%Y-%m-%d"),
                        to_date.format("%Y-%m-%d")
                    );
                    println!();
                    println!(
                        "{:<20} {:>12} {:>8} {:>12} {:>8}",
                        "CATEGORY", "TOTAL", "COUNT", "AVERAGE", "PERCENT"
                    );
                    println!("{}", "-".repeat(65));

                    for cat in &report.categories {
                        println!(
                            "{:<20} {:>12} {:>8} {:>12} {:>7.1}%",
                            truncate(&cat.category, 20),
                            format_cents(cat.total),
                            cat.count,
                            format_cents(cat.average),
                            cat.percentage
                        );
                    }

                    println!("{}", "-".repeat(65));
                    println!("{:<20} {:>12}", "TOTAL", format_cents(report.total));
                }
            }
        }

        ReportCommands::Trend { year, format } => {
            let year = year.unwrap_or_else(|| YearMonth::current().year());
            let trend = service.monthly_trend(year).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&trend)?);
                }
                "csv" => write_trend_csv(std::io::stdout(), &trend)?,
                _ => {
                    println!("Monthly trend for {}", year);
                    println!();
                    println!("{:<9} {:>12} {:>12} {:>12}", "MONTH", "INCOME", "EXPENSE", "NET");
                    println!("{}", "-".repeat(48));
                    for m in &trend.months {
                        println!(
                            "{:<9} {:>12} {:>12} {:>12}",
                            m.month.to_string(),
                            format_cents(m.income),
                            format_cents(m.expense),
                            format_cents(m.net)
                        );
                    }
                    println!("{}", "-".repeat(48));
                    println!(
                        "{:<9} {:>12} {:>12} {:>12}",
                        "TOTAL",
                        format_cents(trend.total_income),
                        format_cents(trend.total_expense),
                        format_cents(trend.total_income - trend.total_expense)
                    );
                }
            }
        }

        ReportCommands::Savings { format } => {
            let overview = service.savings_overview().await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&overview)?);
                }
                "csv" => write_savings_csv(std::io::stdout(), &overview)?,
                _ => {
                    println!("Savings overview");
                    println!();
                    println!("  Active goals: {}", overview.active_goals);
                    println!("  Saved:        {}", format_cents(overview.total_current));
                    println!("  Target:       {}", format_cents(overview.total_target));
                    println!("  Progress:     {:.1}%", overview.progress_percent);
                }
            }
        }
    }

    Ok(())
}

fn write_category_csv<W: Write>(writer: W, categories: &[CategorySummary]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["category", "total", "count", "average", "percentage"])?;
    for cat in categories {
        wtr.write_record([
            cat.category.clone(),
            cat.total.to_string(),
            cat.count.to_string(),
            cat.average.to_string(),
            format!("{:.2}", cat.percentage),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_trend_csv<W: Write>(writer: W, trend: &MonthlyTrend) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["month", "income", "expense", "net"])?;
    for m in &trend.months {
        wtr.write_record([
            m.month.to_string(),
            m.income.to_string(),
            m.expense.to_string(),
            m.net.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_savings_csv<W: Write>(writer: W, overview: &SavingsOverview) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["total_target", "total_current", "progress_percent", "active_goals"])?;
    wtr.write_record([
        overview.total_target.to_string(),
        overview.total_current.to_string(),
        format!("{:.2}", overview.progress_percent),
        overview.active_goals.to_string(),
    ])?;
    wtr.flush()?;
    Ok(())
}

async fn run_settings_command(service: &FinanceService, cmd: SettingsCommands) -> Result<()> {
    let settings = match cmd {
        SettingsCommands::Show => service.settings().await?,
        SettingsCommands::Set {
            currency,
            monthly_income,
            savings_target,
        } => {
            let update = SettingsUpdate {
                currency,
                monthly_income_cents: monthly_income.as_deref().map(parse_cents).transpose()?,
                savings_target_cents: savings_target.as_deref().map(parse_cents).transpose()?,
            };
            service.update_settings(update).await?
        }
    };

    println!("Currency:        {}", settings.currency);
    println!("Monthly income:  {}", format_cents(settings.monthly_income_cents));
    println!("Savings target:  {}", format_cents(settings.savings_target_cents));
    Ok(())
}

async fn run_export_command(
    service: &FinanceService,
    export_type: &str,
    output: Option<&str>,
    month: Option<YearMonth>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "accounts" => {
            let count = exporter.export_accounts_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} accounts", count);
            }
        }
        "budgets" => {
            let month = month.unwrap_or_else(YearMonth::current);
            let count = exporter.export_budgets_csv(writer, month).await?;
            if output.is_some() {
                eprintln!("Exported {} budgets for {}", count, month);
            }
        }
        "goals" => {
            let count = exporter.export_goals_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} savings goals", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported full database: {} accounts, {} categories, {} transactions, {} budgets, {} goals, {} templates",
                    snapshot.accounts.len(),
                    snapshot.categories.len(),
                    snapshot.transactions.len(),
                    snapshot.budgets.len(),
                    snapshot.goals.len(),
                    snapshot.templates.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, accounts, budgets, goals, full",
                export_type
            );
        }
    }

    Ok(())
}

/// Start of the current month up to the end of today, unless given.
fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let to_date = match to {
        Some(date_str) => parse_date_end(&date_str)?,
        None => end_of_day(Utc::now().date_naive())?,
    };

    let from_date = match from {
        Some(date_str) => parse_date(&date_str)?,
        None => YearMonth::current().bounds().0,
    };

    Ok((from_date, to_date))
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid transaction ID format (expected UUID)")
}

/// A strictly positive amount.
fn parse_amount(amount: &str) -> Result<i64> {
    let cents = parse_cents(amount).context("Invalid amount format. Use '50.00' or '50'")?;
    if cents <= 0 {
        anyhow::bail!("Amount must be positive, got {}", amount);
    }
    Ok(cents)
}

fn parse_signed_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).context("Invalid amount format. Use '50.00' or '-50'")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn parse_day(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

/// Midnight UTC at the start of the given day.
fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let naive_datetime = parse_day(date_str)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}

/// Exclusive upper bound covering the whole given day.
fn parse_date_end(date_str: &str) -> Result<DateTime<Utc>> {
    end_of_day(parse_day(date_str)?)
}

fn end_of_day(day: NaiveDate) -> Result<DateTime<Utc>> {
    let next = day
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("Date out of range"))?;
    Ok(DateTime::from_naive_utc_and_offset(next, Utc))
}
