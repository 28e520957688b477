//! Pure progress arithmetic: counts, watched time, daily logs, goals and streaks.
//!
//! Every function computes an updated value from the current one; persisting the
//! result is the caller's job.

use chrono::NaiveDate;

use crate::model::{DailyGoal, DailyLog, Streak, TrackedVideo, Watchable};
use crate::time::previous_day;

//
// ─── COLLECTION AGGREGATES ─────────────────────────────────────────────────────
//

/// `(completed, total)` units, counting chunks of chunked videos individually.
#[must_use]
pub fn unit_counts(videos: &[TrackedVideo]) -> (usize, usize) {
    videos
        .iter()
        .flat_map(TrackedVideo::units)
        .fold((0, 0), |(done, total), unit| {
            (done + usize::from(unit.is_watched()), total + 1)
        })
}

/// Completion as an angle for a progress ring, in `[0, 360]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_degrees(videos: &[TrackedVideo]) -> f64 {
    let (completed, total) = unit_counts(videos);
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 360.0
}

/// Sums unit durations into `(watched, remaining)` seconds.
#[must_use]
pub fn watched_vs_remaining_seconds(videos: &[TrackedVideo]) -> (u64, u64) {
    videos
        .iter()
        .flat_map(TrackedVideo::units)
        .fold((0, 0), |(watched, remaining), unit| {
            let secs = u64::from(unit.duration_seconds());
            if unit.is_watched() {
                (watched + secs, remaining)
            } else {
                (watched, remaining + secs)
            }
        })
}

/// Summary shown on a subject page.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectProgress {
    pub total_units: usize,
    pub completed_units: usize,
    pub degrees: f64,
    pub watched_seconds: u64,
    pub remaining_seconds: u64,
}

impl SubjectProgress {
    #[must_use]
    pub fn from_videos(videos: &[TrackedVideo]) -> Self {
        let (completed_units, total_units) = unit_counts(videos);
        let (watched_seconds, remaining_seconds) = watched_vs_remaining_seconds(videos);
        Self {
            total_units,
            completed_units,
            degrees: progress_degrees(videos),
            watched_seconds,
            remaining_seconds,
        }
    }

    #[must_use]
    pub fn watched_hours(&self) -> f64 {
        seconds_to_hours(self.watched_seconds)
    }

    #[must_use]
    pub fn remaining_hours(&self) -> f64 {
        seconds_to_hours(self.remaining_seconds)
    }

    /// Watched share of the total duration, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn watched_percent(&self) -> f64 {
        let total = self.watched_seconds + self.remaining_seconds;
        if total == 0 {
            return 0.0;
        }
        self.watched_seconds as f64 / total as f64 * 100.0
    }
}

/// Each entry's percentage of the total, in input order. All zeros when nothing was
/// watched.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage_shares(watched_seconds: &[u64]) -> Vec<f64> {
    let total: u64 = watched_seconds.iter().sum();
    if total == 0 {
        return vec![0.0; watched_seconds.len()];
    }
    watched_seconds
        .iter()
        .map(|&seconds| seconds as f64 / total as f64 * 100.0)
        .collect()
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn seconds_to_hours(seconds: u64) -> f64 {
    seconds as f64 / 3600.0
}

/// Minutes with one decimal place, as displayed for "studied today".
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn minutes_rounded(seconds: u64) -> f64 {
    (seconds as f64 / 60.0 * 10.0).round() / 10.0
}

//
// ─── DAILY LOG ─────────────────────────────────────────────────────────────────
//

/// Adds `delta_seconds` when a unit becomes watched, subtracts it otherwise.
///
/// The result never drops below zero. Toggling the same direction twice counts twice;
/// callers must only call this for an actual flag change.
#[must_use]
pub fn apply_watch_toggle(log: &DailyLog, delta_seconds: u64, now_watched: bool) -> DailyLog {
    let seconds_watched = if now_watched {
        log.seconds_watched.saturating_add(delta_seconds)
    } else {
        log.seconds_watched.saturating_sub(delta_seconds)
    };
    DailyLog {
        seconds_watched,
        ..log.clone()
    }
}

//
// ─── GOALS & STREAKS ───────────────────────────────────────────────────────────
//

/// Applies a signed change to a goal's completed time.
///
/// Returns the updated goal and whether this call crossed the goal threshold for the
/// first time. A crossing marks the goal achieved; later calls never un-achieve it.
/// Goals of zero hours never cross.
#[must_use]
pub fn apply_goal_progress(goal: &DailyGoal, delta_seconds: i64) -> (DailyGoal, bool) {
    let before = goal.completed_seconds;
    let after = if delta_seconds >= 0 {
        before.saturating_add(delta_seconds.unsigned_abs())
    } else {
        before.saturating_sub(delta_seconds.unsigned_abs())
    };

    let target = goal.goal_seconds();
    let crossed = !goal.achieved && target > 0 && before < target && after >= target;

    let updated = DailyGoal {
        completed_seconds: after,
        achieved: goal.achieved || crossed,
        ..goal.clone()
    };
    (updated, crossed)
}

/// Replaces a goal's target, keeping its completed time.
///
/// Lowering the target to or below the time already studied achieves the goal, and
/// the second value reports that crossing. Invalid hours become zero.
#[must_use]
pub fn apply_goal_hours(goal: &DailyGoal, goal_hours: f64) -> (DailyGoal, bool) {
    let retargeted = DailyGoal {
        completed_seconds: goal.completed_seconds,
        achieved: goal.achieved,
        ..DailyGoal::new(goal.user_id, goal.date, goal_hours)
    };
    let target = retargeted.goal_seconds();
    let crossed = !goal.achieved && target > 0 && goal.completed_seconds >= target;
    let updated = DailyGoal {
        achieved: goal.achieved || crossed,
        ..retargeted
    };
    (updated, crossed)
}

/// Records a goal crossing on `today`.
///
/// A stale streak is reset first, so a crossing after a gap starts again at 1.
/// Crossings are counted at most once per calendar day.
#[must_use]
pub fn update_streak(streak: Streak, crossed: bool, today: NaiveDate) -> Streak {
    let streak = refresh_streak(streak, today);
    if !crossed || streak.last_achieved_on == Some(today) {
        return streak;
    }
    let current_streak = streak.current_streak.saturating_add(1);
    Streak {
        current_streak,
        best_streak: streak.best_streak.max(current_streak),
        last_achieved_on: Some(today),
    }
}

/// Daily check: resets the current streak when the last achieved day is older than
/// yesterday. `best_streak` is left untouched.
#[must_use]
pub fn refresh_streak(streak: Streak, today: NaiveDate) -> Streak {
    match streak.last_achieved_on {
        Some(last) if last < previous_day(today) => Streak {
            current_streak: 0,
            ..streak
        },
        _ => streak,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
