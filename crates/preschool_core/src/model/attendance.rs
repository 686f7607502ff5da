//! Attendance records and attendance-rate arithmetic.
//!
//! # Invariants
//! - At most one record exists per student per date (enforced by service).
//! - `check_out_at` requires `check_in_at` and is never earlier.
//! - Absent and excused records never carry check-in/out times.

use crate::model::validation::ValidationError;
use crate::model::{new_record_id, Record, RecordId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    /// Absence with a reason; excluded from attendance rates.
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::Excused => "excused",
        }
    }

    /// Present or late.
    pub fn is_attended(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    /// Class the student belonged to on `date`.
    pub class_id: Option<RecordId>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    /// Unix epoch milliseconds.
    pub check_in_at: Option<i64>,
    /// Unix epoch milliseconds.
    pub check_out_at: Option<i64>,
    /// Name of the adult dropping off.
    pub checked_in_by: Option<String>,
    /// Name of the adult picking up.
    pub checked_out_by: Option<String>,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    pub fn new(
        student_id: RecordId,
        class_id: Option<RecordId>,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Self {
        Self {
            id: new_record_id(),
            student_id,
            class_id,
            date,
            status,
            check_in_at: None,
            check_out_at: None,
            checked_in_by: None,
            checked_out_by: None,
            notes: None,
        }
    }

    /// Checked in and not yet checked out.
    pub fn is_on_site(&self) -> bool {
        self.check_in_at.is_some() && self.check_out_at.is_none()
    }
}

impl Record for AttendanceRecord {
    const COLLECTION: &'static str = "attendance";

    fn id(&self) -> RecordId {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match (self.check_in_at, self.check_out_at) {
            (None, Some(_)) => {
                return Err(ValidationError::invalid(
                    "check_out_at",
                    "requires check_in_at",
                ));
            }
            (Some(check_in), Some(check_out)) if check_out < check_in => {
                return Err(ValidationError::invalid(
                    "check_out_at",
                    "must not be earlier than check_in_at",
                ));
            }
            _ => {}
        }
        if !self.status.is_attended() && self.check_in_at.is_some() {
            return Err(ValidationError::invalid(
                "status",
                "absent or excused records cannot carry a check-in",
            ));
        }
        Ok(())
    }
}

/// Attendance counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceRate {
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub excused: u32,
}

impl AttendanceRate {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        let mut rate = Self::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => rate.present += 1,
                AttendanceStatus::Late => rate.late += 1,
                AttendanceStatus::Absent => rate.absent += 1,
                AttendanceStatus::Excused => rate.excused += 1,
            }
        }
        rate
    }

    pub fn attended(&self) -> u32 {
        self.present + self.late
    }

    /// Days that count toward the rate; excused days are left out.
    pub fn countable_days(&self) -> u32 {
        self.attended() + self.absent
    }

    /// Attended share of countable days in `[0, 1]`, `None` with no data.
    pub fn rate(&self) -> Option<f64> {
        let countable = self.countable_days();
        if countable == 0 {
            return None;
        }
        Some(f64::from(self.attended()) / f64::from(countable))
    }
}

#[cfg(test)]
mod tests {
    use super::{AttendanceRate, AttendanceRecord, AttendanceStatus};
    use crate::model::Record;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn record(status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord::new(
            Uuid::new_v4(),
            None,
            NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            status,
        )
    }

    #[test]
    fn rate_excludes_excused_days() {
        let records = vec![
            record(AttendanceStatus::Present),
            record(AttendanceStatus::Late),
            record(AttendanceStatus::Absent),
            record(AttendanceStatus::Excused),
            record(AttendanceStatus::Excused),
        ];
        let rate = AttendanceRate::from_records(&records);
        assert_eq!(rate.attended(), 2);
        assert_eq!(rate.countable_days(), 3);
        let value = rate.rate().unwrap();
        assert!((value - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rate_is_none_without_countable_days() {
        let records = vec![record(AttendanceStatus::Excused)];
        assert_eq!(AttendanceRate::from_records(&records).rate(), None);
        assert_eq!(AttendanceRate::default().rate(), None);
    }

    #[test]
    fn check_out_must_follow_check_in() {
        let mut record = record(AttendanceStatus::Present);
        record.check_out_at = Some(10);
        assert!(record.validate().is_err());
        record.check_in_at = Some(20);
        assert!(record.validate().is_err());
        record.check_out_at = Some(20);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn absent_record_cannot_be_checked_in() {
        let mut record = record(AttendanceStatus::Absent);
        record.check_in_at = Some(5);
        assert!(record.validate().is_err());
    }
}
