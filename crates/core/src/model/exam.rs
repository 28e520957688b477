use chrono::{DateTime, Utc};

use crate::model::{ModelError, validate_name};
use crate::model::ids::{ExamId, SubjectId, UserId};

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// Top-level grouping a user prepares for (e.g. a certification or entrance exam).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    user_id: UserId,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl Exam {
    /// Creates an exam, trimming the name.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::EmptyExamName` if the name is blank.
    pub fn new(
        id: ExamId,
        user_id: UserId,
        name: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        let name = validate_name(&name.into(), ModelError::EmptyExamName)?;
        Ok(Self {
            id,
            user_id,
            name,
            description: description.into(),
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A subject inside an exam; owns an ordered list of videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    exam_id: ExamId,
    name: String,
    daily_goal_minutes: u32,
}

impl Subject {
    /// # Errors
    ///
    /// Returns `ModelError::EmptySubjectName` if the name is blank.
    pub fn new(
        id: SubjectId,
        exam_id: ExamId,
        name: impl Into<String>,
        daily_goal_minutes: u32,
    ) -> Result<Self, ModelError> {
        let name = validate_name(&name.into(), ModelError::EmptySubjectName)?;
        Ok(Self {
            id,
            exam_id,
            name,
            daily_goal_minutes,
        })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn daily_goal_minutes(&self) -> u32 {
        self.daily_goal_minutes
    }

    #[must_use]
    pub fn with_daily_goal_minutes(mut self, minutes: u32) -> Self {
        self.daily_goal_minutes = minutes;
        self
    }
}
