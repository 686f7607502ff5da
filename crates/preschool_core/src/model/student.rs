//! Student and guardian records.
//!
//! # Invariants
//! - A student links to guardians through `guardian_ids`; each guardian
//!   mirrors the link in `student_ids`. Services keep both sides in step.
//! - `waitlist_applied_at` orders the admission queue.

use crate::model::validation::{
    require_non_blank_entries, require_text, validate_optional_email, validate_optional_phone,
    ValidationError,
};
use crate::model::{new_record_id, Record, RecordId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Enrollment status of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    /// Enrolled and attending.
    Active,
    /// Pending admission review.
    Waitlist,
    /// Enrolled but temporarily not attending.
    Inactive,
    Withdrawn,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Waitlist => "waitlist",
            Self::Inactive => "inactive",
            Self::Withdrawn => "withdrawn",
            Self::Graduated => "graduated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub status: StudentStatus,
    pub class_id: Option<RecordId>,
    pub program_id: Option<RecordId>,
    #[serde(default)]
    pub guardian_ids: Vec<RecordId>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub medical_notes: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    /// Unix epoch milliseconds when the student joined the waitlist.
    pub waitlist_applied_at: Option<i64>,
}

impl Student {
    /// Creates an active student with no class, program or guardians.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            id: new_record_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            status: StudentStatus::Active,
            class_id: None,
            program_id: None,
            guardian_ids: Vec::new(),
            allergies: Vec::new(),
            medical_notes: None,
            enrollment_date: None,
            waitlist_applied_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// Completed months of age on `on`, zero for dates before birth.
    pub fn age_in_months(&self, on: NaiveDate) -> u32 {
        age_in_months(self.date_of_birth, on)
    }

    pub fn is_enrolled(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

impl Record for Student {
    const COLLECTION: &'static str = "students";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_non_blank_entries("allergies", &self.allergies)?;
        if let Some(enrolled) = self.enrollment_date {
            if enrolled < self.date_of_birth {
                return Err(ValidationError::invalid(
                    "enrollment_date",
                    "must not precede date_of_birth",
                ));
            }
        }
        if self.status == StudentStatus::Waitlist && self.waitlist_applied_at.is_none() {
            return Err(ValidationError::MissingField("waitlist_applied_at"));
        }
        Ok(())
    }
}

/// Parent or caregiver linked to one or more students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    /// Free-form relationship label, e.g. `mother` or `grandparent`.
    pub relationship: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub student_ids: Vec<RecordId>,
    #[serde(default)]
    pub is_emergency_contact: bool,
    #[serde(default)]
    pub authorized_pickup: bool,
}

impl Guardian {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            relationship: relationship.into(),
            email: None,
            phone: None,
            student_ids: Vec::new(),
            is_emergency_contact: false,
            authorized_pickup: true,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl Record for Guardian {
    const COLLECTION: &'static str = "guardians";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name)?;
        require_text("last_name", &self.last_name)?;
        require_text("relationship", &self.relationship)?;
        validate_optional_email(self.email.as_deref())?;
        validate_optional_phone(self.phone.as_deref())?;
        if self.email.is_none() && self.phone.is_none() {
            return Err(ValidationError::invalid(
                "contact",
                "either email or phone is required",
            ));
        }
        Ok(())
    }
}

pub(crate) fn age_in_months(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    if on <= date_of_birth {
        return 0;
    }
    let mut months = (on.year() - date_of_birth.year()) * 12
        + (on.month() as i32 - date_of_birth.month() as i32);
    if on.day() < date_of_birth.day() {
        months -= 1;
    }
    u32::try_from(months).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{age_in_months, Guardian, Student, StudentStatus};
    use crate::model::{Record, ValidationError};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_months() {
        let dob = date(2021, 3, 15);
        assert_eq!(age_in_months(dob, date(2021, 3, 1)), 0);
        assert_eq!(age_in_months(dob, date(2022, 3, 14)), 11);
        assert_eq!(age_in_months(dob, date(2022, 3, 15)), 12);
        assert_eq!(age_in_months(dob, date(2024, 9, 1)), 41);
    }

    #[test]
    fn waitlisted_student_needs_application_time() {
        let mut student = Student::new("Ava", "Lopez", date(2021, 5, 2));
        student.status = StudentStatus::Waitlist;
        assert_eq!(
            student.validate(),
            Err(ValidationError::MissingField("waitlist_applied_at"))
        );
        student.waitlist_applied_at = Some(1);
        assert!(student.validate().is_ok());
    }

    #[test]
    fn guardian_needs_a_contact_channel() {
        let mut guardian = Guardian::new("Maria", "Lopez", "mother");
        assert!(guardian.validate().is_err());
        guardian.phone = Some("555-010-2030".to_string());
        assert!(guardian.validate().is_ok());
        guardian.email = Some("not-an-email".to_string());
        assert!(matches!(
            guardian.validate(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn student_serializes_with_snake_case_status_and_iso_dates() {
        let student = Student::new("Ava", "Lopez", date(2021, 5, 2));
        let value = serde_json::to_value(&student).unwrap();
        assert_eq!(value["status"], "active");
        assert_eq!(value["date_of_birth"], "2021-05-02");
        assert_eq!(value["id"], student.id.to_string());
    }
}
