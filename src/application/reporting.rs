use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CategoryId, Cents, EntryKind, GoalTotals, YearMonth, percent_of};
use crate::storage::CategoryTotal;

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Income, expense and spending breakdown for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: YearMonth,
    pub total_income: Cents,
    pub total_expense: Cents,
    /// Income minus expense; negative when overspending.
    pub balance: Cents,
    pub expense_by_category: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: Option<CategoryId>,
    pub category: String,
    pub color: Option<String>,
    pub total: Cents,
    pub count: i64,
    pub average: Cents,
    /// Share of the report total, in [0, 100].
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub kind: EntryKind,
    pub categories: Vec<CategorySummary>,
    pub total: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthTotals {
    pub month: YearMonth,
    pub income: Cents,
    pub expense: Cents,
    pub net: Cents,
}

/// Twelve months of income and expense, January first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub months: Vec<MonthTotals>,
    pub total_income: Cents,
    pub total_expense: Cents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsOverview {
    pub total_target: Cents,
    pub total_current: Cents,
    pub progress_percent: f64,
    pub active_goals: i64,
}

impl From<GoalTotals> for SavingsOverview {
    fn from(totals: GoalTotals) -> Self {
        Self {
            total_target: totals.total_target,
            total_current: totals.total_current,
            progress_percent: percent_of(totals.total_current, totals.total_target),
            active_goals: totals.active_goals,
        }
    }
}

/// Turn raw per-category sums into summaries with shares of the grand total.
pub fn summarize_categories(totals: Vec<CategoryTotal>) -> (Vec<CategorySummary>, Cents) {
    let grand_total: Cents = totals.iter().map(|t| t.total).sum();

    let summaries = totals
        .into_iter()
        .map(|t| CategorySummary {
            category_id: t.category_id,
            category: t
                .category_name
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            color: t.category_color,
            total: t.total,
            count: t.count,
            average: if t.count > 0 { t.total / t.count } else { 0 },
            percentage: percent_of(t.total, grand_total),
        })
        .collect();

    (summaries, grand_total)
}
