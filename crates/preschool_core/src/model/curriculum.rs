//! Curriculum items (lesson plans).

use crate::model::validation::{require_non_blank_entries, require_text, ValidationError};
use crate::model::{new_record_id, Record, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Developmental area a lesson targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningDomain {
    Literacy,
    Numeracy,
    Science,
    Art,
    Music,
    MotorSkills,
    SocialEmotional,
    Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Draft,
    Planned,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumItem {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    /// `None` for school-wide activities.
    pub class_id: Option<RecordId>,
    pub domain: LearningDomain,
    pub planned_date: NaiveDate,
    pub duration_minutes: u32,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    pub status: LessonStatus,
    /// Staff member who authored the plan.
    pub created_by: Option<RecordId>,
}

impl CurriculumItem {
    pub fn new(
        title: impl Into<String>,
        domain: LearningDomain,
        planned_date: NaiveDate,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: new_record_id(),
            title: title.into(),
            description: None,
            class_id: None,
            domain,
            planned_date,
            duration_minutes,
            materials: Vec::new(),
            objectives: Vec::new(),
            status: LessonStatus::Planned,
            created_by: None,
        }
    }
}

impl Record for CurriculumItem {
    const COLLECTION: &'static str = "curriculum";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        if self.duration_minutes == 0 {
            return Err(ValidationError::invalid(
                "duration_minutes",
                "must be greater than zero",
            ));
        }
        require_non_blank_entries("materials", &self.materials)?;
        require_non_blank_entries("objectives", &self.objectives)?;
        Ok(())
    }
}
