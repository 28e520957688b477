use async_trait::async_trait;
use study_core::model::{UserId, UserProfile};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_profile_row};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, catalog_api_key, default_goal_hours
            FROM user_profiles
            WHERE user_id = ?1
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_profiles (user_id, catalog_api_key, default_goal_hours)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET
                catalog_api_key = excluded.catalog_api_key,
                default_goal_hours = excluded.default_goal_hours
            ",
        )
        .bind(id_to_i64("user_id", profile.user_id.value())?)
        .bind(profile.catalog_api_key.as_deref())
        .bind(profile.default_goal_hours.max(0.0))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
