//! Class (room/group) and program records.

use crate::model::validation::{require_text, ValidationError};
use crate::model::{new_record_id, Record, RecordId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramSchedule {
    FullDay,
    HalfDayMorning,
    HalfDayAfternoon,
    ExtendedDay,
}

/// Enrollment offering, e.g. "Full-day Pre-K".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub schedule: ProgramSchedule,
    pub days_per_week: u8,
    pub monthly_tuition_cents: Option<u64>,
}

impl Program {
    pub fn new(name: impl Into<String>, schedule: ProgramSchedule, days_per_week: u8) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            description: None,
            schedule,
            days_per_week,
            monthly_tuition_cents: None,
        }
    }
}

impl Record for Program {
    const COLLECTION: &'static str = "programs";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if !(1..=7).contains(&self.days_per_week) {
            return Err(ValidationError::invalid(
                "days_per_week",
                "must be between 1 and 7",
            ));
        }
        Ok(())
    }
}

/// A group of students sharing a room and teachers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: RecordId,
    pub name: String,
    pub room: Option<String>,
    pub program_id: Option<RecordId>,
    /// Maximum number of active students.
    pub capacity: u32,
    pub min_age_months: Option<u32>,
    pub max_age_months: Option<u32>,
    /// Mirrors `Staff::class_ids`; maintained by staff assignment.
    #[serde(default)]
    pub teacher_ids: Vec<RecordId>,
}

impl Class {
    pub fn new(name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            room: None,
            program_id: None,
            capacity,
            min_age_months: None,
            max_age_months: None,
            teacher_ids: Vec::new(),
        }
    }

    /// Whether a child of `age_months` fits the class age band.
    pub fn accepts_age(&self, age_months: u32) -> bool {
        self.min_age_months.map_or(true, |min| age_months >= min)
            && self.max_age_months.map_or(true, |max| age_months <= max)
    }
}

impl Record for Class {
    const COLLECTION: &'static str = "classes";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if self.capacity == 0 {
            return Err(ValidationError::invalid("capacity", "must be greater than zero"));
        }
        if let (Some(min), Some(max)) = (self.min_age_months, self.max_age_months) {
            if min > max {
                return Err(ValidationError::invalid(
                    "min_age_months",
                    "must not exceed max_age_months",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Class, Program, ProgramSchedule};
    use crate::model::Record;

    #[test]
    fn class_age_band_is_inclusive() {
        let mut class = Class::new("Butterflies", 12);
        class.min_age_months = Some(24);
        class.max_age_months = Some(36);
        assert!(class.accepts_age(24));
        assert!(class.accepts_age(36));
        assert!(!class.accepts_age(37));
        assert!(class.validate().is_ok());

        class.min_age_months = Some(48);
        assert!(class.validate().is_err());
    }

    #[test]
    fn class_and_program_reject_degenerate_values() {
        assert!(Class::new("Empty", 0).validate().is_err());
        assert!(Program::new("Pre-K", ProgramSchedule::FullDay, 0)
            .validate()
            .is_err());
        assert!(Program::new("Pre-K", ProgramSchedule::FullDay, 5)
            .validate()
            .is_ok());
    }
}
