use thiserror::Error;

use crate::domain::{Cents, EntryKind, PeriodError, YearMonth};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account is archived: {0}")]
    AccountArchived(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Category is archived: {0}")]
    CategoryArchived(String),

    #[error("Category '{category}' is for {category_kind}, cannot be used for {requested}")]
    CategoryKindMismatch {
        category: String,
        category_kind: EntryKind,
        requested: EntryKind,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("No budget for {category} in {month}")]
    BudgetNotFound { category: String, month: YearMonth },

    #[error("Savings goal not found: {0}")]
    GoalNotFound(String),

    #[error("Savings goal already exists: {0}")]
    GoalAlreadyExists(String),

    #[error("Savings goal '{name}' would exceed its target: current {current}, target {target}")]
    GoalOverfunded {
        name: String,
        current: Cents,
        target: Cents,
    },

    #[error("Savings goal '{name}' only holds {current}, cannot withdraw {requested}")]
    GoalUnderfunded {
        name: String,
        current: Cents,
        requested: Cents,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template already exists: {0}")]
    TemplateAlreadyExists(String),

    #[error("Template '{0}' has no account; pass one explicitly")]
    TemplateWithoutAccount(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    InvalidPeriod(#[from] PeriodError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
