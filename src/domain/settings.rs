use serde::{Deserialize, Serialize};

use super::Cents;

pub const DEFAULT_CURRENCY: &str = "EUR";

/// Per-database preferences, stored as a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub currency: String,
    pub monthly_income_cents: Cents,
    pub savings_target_cents: Cents,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            monthly_income_cents: 0,
            savings_target_cents: 0,
        }
    }
}
