use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type SavingsGoalId = Uuid;

/// A target amount to save, optionally by a date.
///
/// `current_cents` stays within `0..=target_cents`; the goal counts as
/// completed exactly when it reaches the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: SavingsGoalId,
    pub name: String,
    pub target_cents: Cents,
    pub current_cents: Cents,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub color: String,
    pub icon: String,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

impl SavingsGoal {
    pub fn new(name: String, target_cents: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            target_cents,
            current_cents: 0,
            description: None,
            target_date: None,
            color: "#34C759".to_string(),
            icon: "star".to_string(),
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_current(mut self, current_cents: Cents) -> Self {
        self.current_cents = current_cents;
        self.refresh_completion();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn refresh_completion(&mut self) {
        self.is_completed = self.current_cents >= self.target_cents;
    }

    /// Whole-number progress in [0, 100].
    pub fn progress_percent(&self) -> u8 {
        if self.target_cents <= 0 {
            return 0;
        }
        let pct = self.current_cents.saturating_mul(100) / self.target_cents;
        pct.clamp(0, 100) as u8
    }

    pub fn remaining(&self) -> Cents {
        self.target_cents - self.current_cents
    }

    /// Days until the target date; negative once it has passed.
    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.target_date
            .map(|date| date.signed_duration_since(today).num_days())
    }

    /// Monthly contribution needed to hit the target by the target date.
    /// Overdue or same-month deadlines count as one month left.
    pub fn required_monthly(&self, today: NaiveDate) -> Option<Cents> {
        let date = self.target_date?;
        let remaining = self.remaining().max(0);
        let months = (date.year() - today.year()) as i64 * 12 + date.month() as i64
            - today.month() as i64;
        let months = months.max(1);
        Some((remaining + months - 1) / months)
    }
}

/// Aggregate over goals that are still in progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalTotals {
    pub total_target: Cents,
    pub total_current: Cents,
    pub active_goals: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_progress_truncates() {
        let goal = SavingsGoal::new("Bike".into(), 30000).with_current(10000);
        assert_eq!(goal.progress_percent(), 33);
        assert_eq!(goal.remaining(), 20000);
        assert!(!goal.is_completed);
    }

    #[test]
    fn test_reaching_target_completes() {
        let goal = SavingsGoal::new("Bike".into(), 30000).with_current(30000);
        assert!(goal.is_completed);
        assert_eq!(goal.progress_percent(), 100);
        assert_eq!(goal.remaining(), 0);
    }

    #[test]
    fn test_days_left() {
        let goal = SavingsGoal::new("Trip".into(), 100000).with_target_date(date("2024-03-01"));
        assert_eq!(goal.days_left(date("2024-02-20")), Some(10));
        assert_eq!(goal.days_left(date("2024-03-05")), Some(-4));

        let open = SavingsGoal::new("Rainy day".into(), 100000);
        assert_eq!(open.days_left(date("2024-02-20")), None);
    }

    #[test]
    fn test_required_monthly_rounds_up() {
        let goal = SavingsGoal::new("Trip".into(), 100000)
            .with_current(10000)
            .with_target_date(date("2024-07-15"));
        // 90000 over 4 months (March..July)
        assert_eq!(goal.required_monthly(date("2024-03-10")), Some(22500));
        // 90000 over 7 months (Dec..July) = 12857.14 -> 12858
        assert_eq!(goal.required_monthly(date("2023-12-01")), Some(12858));
        // Past deadline: everything is due now
        assert_eq!(goal.required_monthly(date("2024-09-01")), Some(90000));
    }
}
