use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CategoryId, Cents, YearMonth, percent_of};

pub type BudgetId = Uuid;

/// Monthly spending limit for one expense category.
/// At most one budget exists per (category, month).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub category_id: CategoryId,
    pub month: YearMonth,
    pub amount_cents: Cents,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(category_id: CategoryId, month: YearMonth, amount_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            category_id,
            month,
            amount_cents,
            created_at: Utc::now(),
        }
    }
}

/// A budget compared against what was actually spent in its month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetProgress {
    pub budget: Budget,
    pub category_name: String,
    pub category_color: String,
    pub spent_cents: Cents,
}

impl BudgetProgress {
    /// What is left to spend, never below zero.
    pub fn remaining(&self) -> Cents {
        (self.budget.amount_cents - self.spent_cents).max(0)
    }

    pub fn overspent(&self) -> Cents {
        (self.spent_cents - self.budget.amount_cents).max(0)
    }

    pub fn is_exceeded(&self) -> bool {
        self.spent_cents > self.budget.amount_cents
    }

    pub fn progress_percent(&self) -> f64 {
        percent_of(self.spent_cents, self.budget.amount_cents)
    }
}

/// Totals over all budgets of a single month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetStatistics {
    pub month: YearMonth,
    pub total_budget: Cents,
    pub total_spent: Cents,
}

impl BudgetStatistics {
    /// Unclamped: negative when over budget.
    pub fn remaining(&self) -> Cents {
        self.total_budget - self.total_spent
    }

    pub fn progress_percent(&self) -> f64 {
        percent_of(self.total_spent, self.total_budget)
    }

    pub fn is_over_budget(&self) -> bool {
        self.total_spent > self.total_budget
    }
}
