use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;

/// Direction of money: shared by categories, transactions and templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Expense => "expense",
        }
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(EntryKind::Income),
            "expense" => Ok(EntryKind::Expense),
            other => Err(format!("unknown kind '{}', expected income or expense", other)),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification tag such as "Groceries" or "Salary".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub kind: EntryKind,
    pub color: String,
    pub icon: String,
    pub is_default: bool,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: String, kind: EntryKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            color: "#007AFF".to_string(),
            icon: "receipt".to_string(),
            is_default: false,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
        }
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

    fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Categories a fresh database is seeded with.
pub fn default_categories() -> Vec<Category> {
    let expense = [
        ("Groceries", "#FF6B6B", "cart"),
        ("Transport", "#5856D6", "car"),
        ("Entertainment", "#FFD166", "film"),
        ("Cafe", "#06D6A0", "fork.knife"),
        ("Utilities", "#118AB2", "bolt"),
        ("Health", "#FF2D55", "heart"),
        ("Clothing", "#AF52DE", "bag"),
    ];
    let income = [
        ("Salary", "#32D74B", "dollarsign.circle"),
        ("Freelance", "#0A84FF", "laptopcomputer"),
        ("Investments", "#BF5AF2", "chart.line.uptrend.xyaxis"),
    ];

    let expense = expense.iter().enumerate().map(|(i, (name, color, icon))| {
        Category::new(name.to_string(), EntryKind::Expense)
            .with_color(*color)
            .with_icon(*icon)
            .with_sort_order(i as i64 + 1)
            .as_default()
    });
    // Income sorts after expenses.
    let income = income.iter().enumerate().map(|(i, (name, color, icon))| {
        Category::new(name.to_string(), EntryKind::Income)
            .with_color(*color)
            .with_icon(*icon)
            .with_sort_order(i as i64 + 21)
            .as_default()
    });

    expense.chain(income).collect()
}
