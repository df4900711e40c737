use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, CategoryId, Cents, EntryKind};

pub type TemplateId = Uuid;

/// A saved transaction shape ("Rent", "Coffee") that can be applied
/// repeatedly to record the same kind of entry quickly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    pub kind: EntryKind,
    pub amount_cents: Cents,
    /// Cleared when the account is deleted; the template then needs an
    /// explicit account when applied.
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn new(name: String, kind: EntryKind, amount_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            amount_cents,
            account_id: None,
            category_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }
}
