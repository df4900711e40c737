mod repository;

pub use repository::*;

/// Accounts, categories, transactions, budgets, settings.
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Savings goals and templates.
pub const MIGRATION_002_GOALS_TEMPLATES: &str = include_str!("migrations/002_goals_templates.sql");
