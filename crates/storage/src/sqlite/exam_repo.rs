use study_core::model::{Exam, ExamId, Subject, SubjectId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_exam_row, map_subject_row};
use crate::repository::{ExamRepository, NewExamRecord, NewSubjectRecord, StorageError};

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn insert_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO exams (user_id, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("user_id", exam.user_id.value())?)
        .bind(exam.name.trim().to_owned())
        .bind(exam.description)
        .bind(exam.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("exam id sign overflow".into()))?;
        Ok(ExamId::new(id))
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, name, description, created_at
            FROM exams WHERE id = ?1
            ",
        )
        .bind(id_to_i64("exam_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_exam_row).transpose()
    }

    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, name, description, created_at
            FROM exams
            WHERE user_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_exam_row).collect()
    }

    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError> {
        if self.get_exam(subject.exam_id).await?.is_none() {
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(
            r"
            INSERT INTO subjects (exam_id, name, daily_goal_minutes)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_to_i64("exam_id", subject.exam_id.value())?)
        .bind(subject.name.trim().to_owned())
        .bind(i64::from(subject.daily_goal_minutes))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("subject id sign overflow".into()))?;
        Ok(SubjectId::new(id))
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, exam_id, name, daily_goal_minutes
            FROM subjects WHERE id = ?1
            ",
        )
        .bind(id_to_i64("subject_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_subject_row).transpose()
    }

    async fn list_subjects(&self, exam_id: ExamId) -> Result<Vec<Subject>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, exam_id, name, daily_goal_minutes
            FROM subjects
            WHERE exam_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("exam_id", exam_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_subject_row).collect()
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, exam_id, name, daily_goal_minutes)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                daily_goal_minutes = excluded.daily_goal_minutes
            ",
        )
        .bind(id_to_i64("subject_id", subject.id().value())?)
        .bind(id_to_i64("exam_id", subject.exam_id().value())?)
        .bind(subject.name().to_owned())
        .bind(i64::from(subject.daily_goal_minutes()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        // Subjects, videos, chunks and daily logs follow through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM exams WHERE id = ?1")
            .bind(id_to_i64("exam_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(exam_id = %id, "deleted exam");
        Ok(())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id_to_i64("subject_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        tracing::debug!(subject_id = %id, "deleted subject");
        Ok(())
    }
}
