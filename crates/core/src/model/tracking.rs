use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::ids::{SubjectId, UserId};

/// Seconds watched by a user for one subject on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLog {
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub seconds_watched: u64,
}

impl DailyLog {
    /// A fresh, zeroed log for the given key.
    #[must_use]
    pub fn empty(user_id: UserId, subject_id: SubjectId, date: NaiveDate) -> Self {
        Self {
            user_id,
            subject_id,
            date,
            seconds_watched: 0,
        }
    }
}

/// A user's study-time target for one day.
///
/// `achieved` only ever flips from false to true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoal {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub goal_hours: f64,
    pub completed_seconds: u64,
    pub achieved: bool,
}

impl DailyGoal {
    #[must_use]
    pub fn new(user_id: UserId, date: NaiveDate, goal_hours: f64) -> Self {
        Self {
            user_id,
            date,
            goal_hours: sanitize_hours(goal_hours),
            completed_seconds: 0,
            achieved: false,
        }
    }

    /// Target expressed in whole seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn goal_seconds(&self) -> u64 {
        (sanitize_hours(self.goal_hours) * 3600.0).round() as u64
    }
}

/// Consecutive days on which the daily goal was achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Streak {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_achieved_on: Option<NaiveDate>,
}

/// Per-user settings the outer layer stores alongside the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub catalog_api_key: Option<String>,
    pub default_goal_hours: f64,
}

impl UserProfile {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            catalog_api_key: None,
            default_goal_hours: 0.0,
        }
    }
}

fn sanitize_hours(hours: f64) -> f64 {
    if hours.is_finite() && hours > 0.0 {
        hours
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn goal_seconds_converts_fractional_hours() {
        let goal = DailyGoal::new(UserId::new(1), day(), 1.5);
        assert_eq!(goal.goal_seconds(), 5400);
    }

    #[test]
    fn negative_or_nan_goal_hours_become_zero() {
        assert_eq!(DailyGoal::new(UserId::new(1), day(), -2.0).goal_seconds(), 0);
        assert_eq!(DailyGoal::new(UserId::new(1), day(), f64::NAN).goal_seconds(), 0);
    }
}
