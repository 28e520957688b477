use study_core::model::{ChunkId, SubjectId, Video, VideoChunk, VideoId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_chunk_row, map_video_row, ser, u32_from_i64};
use crate::repository::{NewChunkRecord, NewVideoRecord, StorageError, VideoRepository};

const VIDEO_COLUMNS: &str =
    "id, subject_id, title, external_id, url, duration_seconds, is_watched, position";

#[async_trait::async_trait]
impl VideoRepository for SqliteRepository {
    async fn insert_videos(&self, videos: &[NewVideoRecord]) -> Result<Vec<VideoId>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut ids = Vec::with_capacity(videos.len());

        for video in videos {
            let res = sqlx::query(
                r"
                INSERT INTO videos (subject_id, title, external_id, url, duration_seconds, is_watched, position)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                ",
            )
            .bind(id_to_i64("subject_id", video.subject_id.value())?)
            .bind(video.title.as_str())
            .bind(video.external_id.as_str())
            .bind(video.url.as_str())
            .bind(i64::from(video.duration_seconds))
            .bind(i64::from(video.position))
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StorageError::NotFound
                }
                other => conn(other),
            })?;

            let id = u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("video id sign overflow".into()))?;
            ids.push(VideoId::new(id));
        }

        tx.commit().await.map_err(conn)?;
        tracing::debug!(count = ids.len(), "inserted videos");
        Ok(ids)
    }

    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("video_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_video_row).transpose()
    }

    async fn list_videos(&self, subject_id: SubjectId) -> Result<Vec<Video>, StorageError> {
        let sql = format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE subject_id = ?1 ORDER BY position ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("subject_id", subject_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_video_row).collect()
    }

    async fn max_position(&self, subject_id: SubjectId) -> Result<Option<u32>, StorageError> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(position) FROM videos WHERE subject_id = ?1")
                .bind(id_to_i64("subject_id", subject_id.value())?)
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;

        max.map(|v| u32_from_i64("position", v)).transpose()
    }

    async fn set_video_watched(&self, id: VideoId, watched: bool) -> Result<bool, StorageError> {
        self.flip_flag("videos", id_to_i64("video_id", id.value())?, watched)
            .await
    }

    async fn delete_subject_videos(&self, subject_id: SubjectId) -> Result<u64, StorageError> {
        // Chunks follow through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM videos WHERE subject_id = ?1")
            .bind(id_to_i64("subject_id", subject_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        tracing::debug!(subject_id = %subject_id, removed = res.rows_affected(), "deleted playlist");
        Ok(res.rows_affected())
    }

    async fn replace_chunks(
        &self,
        video_id: VideoId,
        chunks: &[NewChunkRecord],
    ) -> Result<Vec<VideoChunk>, StorageError> {
        if self.get_video(video_id).await?.is_none() {
            return Err(StorageError::NotFound);
        }
        let video_key = id_to_i64("video_id", video_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        sqlx::query("DELETE FROM video_chunks WHERE video_id = ?1")
            .bind(video_key)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let mut stored = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let res = sqlx::query(
                r"
                INSERT INTO video_chunks (video_id, chunk_index, start_seconds, end_seconds, title, is_watched)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(video_key)
            .bind(i64::from(chunk.index))
            .bind(i64::from(chunk.start_seconds))
            .bind(i64::from(chunk.end_seconds))
            .bind(chunk.title.as_str())
            .bind(i64::from(chunk.is_watched))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            let id = u64::try_from(res.last_insert_rowid())
                .map_err(|_| StorageError::Serialization("chunk id sign overflow".into()))?;
            stored.push(
                VideoChunk::new(
                    ChunkId::new(id),
                    video_id,
                    chunk.index,
                    chunk.start_seconds,
                    chunk.end_seconds,
                    chunk.title.clone(),
                    chunk.is_watched,
                )
                .map_err(ser)?,
            );
        }

        tx.commit().await.map_err(conn)?;
        Ok(stored)
    }

    async fn list_chunks(&self, video_id: VideoId) -> Result<Vec<VideoChunk>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, video_id, chunk_index, start_seconds, end_seconds, title, is_watched
            FROM video_chunks
            WHERE video_id = ?1
            ORDER BY chunk_index ASC
            ",
        )
        .bind(id_to_i64("video_id", video_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_chunk_row).collect()
    }

    async fn list_subject_chunks(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<VideoChunk>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.video_id, c.chunk_index, c.start_seconds, c.end_seconds, c.title, c.is_watched
            FROM video_chunks c
            JOIN videos v ON v.id = c.video_id
            WHERE v.subject_id = ?1
            ORDER BY c.video_id ASC, c.chunk_index ASC
            ",
        )
        .bind(id_to_i64("subject_id", subject_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_chunk_row).collect()
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<VideoChunk>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, video_id, chunk_index, start_seconds, end_seconds, title, is_watched
            FROM video_chunks WHERE id = ?1
            ",
        )
        .bind(id_to_i64("chunk_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_chunk_row).transpose()
    }

    async fn set_chunk_watched(&self, id: ChunkId, watched: bool) -> Result<bool, StorageError> {
        self.flip_flag("video_chunks", id_to_i64("chunk_id", id.value())?, watched)
            .await
    }
}
