use chrono::NaiveDate;
use sqlx::SqliteConnection;
use study_core::model::{DailyGoal, DailyLog, Streak, SubjectId, UserId};
use study_core::progress::{apply_goal_hours, apply_goal_progress, refresh_streak, update_streak};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_daily_log_row, map_goal_row, map_streak_row, seconds_to_i64,
};
use crate::repository::{GoalUpdate, ProgressRepository, StorageError};

async fn fetch_goal(
    db: &mut SqliteConnection,
    user_id: UserId,
    date: NaiveDate,
) -> Result<Option<DailyGoal>, StorageError> {
    let row = sqlx::query(
        r"
        SELECT user_id, date, goal_hours, completed_seconds, achieved
        FROM daily_goals
        WHERE user_id = ?1 AND date = ?2
        ",
    )
    .bind(id_to_i64("user_id", user_id.value())?)
    .bind(date)
    .fetch_optional(&mut *db)
    .await
    .map_err(conn)?;

    row.as_ref().map(map_goal_row).transpose()
}

async fn write_goal(db: &mut SqliteConnection, goal: &DailyGoal) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO daily_goals (user_id, date, goal_hours, completed_seconds, achieved)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(user_id, date) DO UPDATE SET
            goal_hours = excluded.goal_hours,
            completed_seconds = excluded.completed_seconds,
            achieved = excluded.achieved
        ",
    )
    .bind(id_to_i64("user_id", goal.user_id.value())?)
    .bind(goal.date)
    .bind(goal.goal_hours.max(0.0))
    .bind(seconds_to_i64(goal.completed_seconds)?)
    .bind(i64::from(goal.achieved))
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    Ok(())
}

async fn fetch_streak(
    db: &mut SqliteConnection,
    user_id: UserId,
) -> Result<Option<Streak>, StorageError> {
    let row = sqlx::query(
        r"
        SELECT current_streak, best_streak, last_achieved_on
        FROM streaks WHERE user_id = ?1
        ",
    )
    .bind(id_to_i64("user_id", user_id.value())?)
    .fetch_optional(&mut *db)
    .await
    .map_err(conn)?;

    row.as_ref().map(map_streak_row).transpose()
}

async fn write_streak(
    db: &mut SqliteConnection,
    user_id: UserId,
    streak: &Streak,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
        INSERT INTO streaks (user_id, current_streak, best_streak, last_achieved_on)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(user_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            best_streak = excluded.best_streak,
            last_achieved_on = excluded.last_achieved_on
        ",
    )
    .bind(id_to_i64("user_id", user_id.value())?)
    .bind(i64::from(streak.current_streak))
    .bind(i64::from(streak.best_streak))
    .bind(streak.last_achieved_on)
    .execute(&mut *db)
    .await
    .map_err(conn)?;

    Ok(())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_daily_log(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyLog>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, subject_id, date, seconds_watched
            FROM daily_logs
            WHERE user_id = ?1 AND subject_id = ?2 AND date = ?3
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_daily_log_row).transpose()
    }

    async fn add_log_seconds(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
        delta_seconds: i64,
    ) -> Result<DailyLog, StorageError> {
        // One statement, so the addition happens under SQLite's write lock.
        let row = sqlx::query(
            r"
            INSERT INTO daily_logs (user_id, subject_id, date, seconds_watched)
            VALUES (?1, ?2, ?3, MAX(0, ?4))
            ON CONFLICT(user_id, subject_id, date) DO UPDATE SET
                seconds_watched = MAX(0, daily_logs.seconds_watched + ?4)
            RETURNING user_id, subject_id, date, seconds_watched
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .bind(date)
        .bind(delta_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        let log = map_daily_log_row(&row)?;
        tracing::debug!(
            user_id = %user_id,
            subject_id = %subject_id,
            %date,
            delta_seconds,
            seconds = log.seconds_watched,
            "daily log updated"
        );
        Ok(log)
    }

    async fn get_goal(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyGoal>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_goal(&mut db, user_id, date).await
    }

    async fn add_goal_seconds(
        &self,
        user_id: UserId,
        date: NaiveDate,
        default_hours: f64,
        delta_seconds: i64,
    ) -> Result<GoalUpdate, StorageError> {
        let mut tx = self.begin_immediate().await?;
        let current = fetch_goal(&mut tx, user_id, date)
            .await?
            .unwrap_or_else(|| DailyGoal::new(user_id, date, default_hours));
        let (goal, crossed) = apply_goal_progress(&current, delta_seconds);
        write_goal(&mut tx, &goal).await?;
        tx.commit().await.map_err(conn)?;

        Ok(GoalUpdate { goal, crossed })
    }

    async fn set_goal_hours(
        &self,
        user_id: UserId,
        date: NaiveDate,
        goal_hours: f64,
    ) -> Result<GoalUpdate, StorageError> {
        let mut tx = self.begin_immediate().await?;
        let current = fetch_goal(&mut tx, user_id, date)
            .await?
            .unwrap_or_else(|| DailyGoal::new(user_id, date, goal_hours));
        let (goal, crossed) = apply_goal_hours(&current, goal_hours);
        write_goal(&mut tx, &goal).await?;
        tx.commit().await.map_err(conn)?;

        Ok(GoalUpdate { goal, crossed })
    }

    async fn get_streak(&self, user_id: UserId) -> Result<Option<Streak>, StorageError> {
        let mut db = self.pool.acquire().await.map_err(conn)?;
        fetch_streak(&mut db, user_id).await
    }

    async fn record_crossing(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Streak, StorageError> {
        let mut tx = self.begin_immediate().await?;
        let current = fetch_streak(&mut tx, user_id).await?.unwrap_or_default();
        let streak = update_streak(current, true, date);
        write_streak(&mut tx, user_id, &streak).await?;
        tx.commit().await.map_err(conn)?;

        Ok(streak)
    }

    async fn refresh_streak(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<Streak, StorageError> {
        let mut tx = self.begin_immediate().await?;
        let Some(current) = fetch_streak(&mut tx, user_id).await? else {
            return Ok(Streak::default());
        };
        let streak = refresh_streak(current, today);
        if streak != current {
            write_streak(&mut tx, user_id, &streak).await?;
            tx.commit().await.map_err(conn)?;
        }
        Ok(streak)
    }
}
