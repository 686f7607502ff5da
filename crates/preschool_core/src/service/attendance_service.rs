//! Attendance use-cases: check-in/out, absences, summaries and rates.
//!
//! # Responsibility
//! - Keep at most one attendance record per student per date.
//! - Classify check-ins as present or late from organization settings.
//! - Aggregate daily summaries and attendance rates.
//!
//! # Invariants
//! - Check-in requires an active student.
//! - A student is checked in and out at most once per date.
//! - Absent and excused records never carry check-in times.

use crate::model::attendance::{AttendanceRate, AttendanceRecord, AttendanceStatus};
use crate::model::class::Class;
use crate::model::student::{Student, StudentStatus};
use crate::model::validation::ValidationError;
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{DocumentQuery, DocumentStore, Filter, OrderDirection};
use crate::repo::record_store::RecordStore;
use crate::service::error::{read_back, require_record, ServiceError, ServiceResult};
use crate::service::organization_service::load_settings;
use chrono::NaiveDate;
use log::info;

/// Check-in input for one student on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInRequest {
    pub student_id: RecordId,
    pub date: NaiveDate,
    /// Unix epoch milliseconds of arrival.
    pub at_epoch_ms: i64,
    /// Free-form name or id of the adult dropping off.
    pub checked_in_by: Option<String>,
    pub notes: Option<String>,
}

/// Per-status counts for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceSummary {
    pub date: NaiveDate,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
    pub excused: u32,
    /// Attended students who already left.
    pub checked_out: u32,
    /// Active students without any record for the date.
    pub not_recorded: u32,
}

impl AttendanceSummary {
    pub fn expected(&self) -> u32 {
        self.present + self.late + self.absent + self.excused + self.not_recorded
    }
}

/// Attendance service facade over a document store.
pub struct AttendanceService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> AttendanceService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Checks a student in, marking them late after opening time plus grace.
    ///
    /// An existing absence record for the date is replaced by the check-in.
    ///
    /// # Errors
    /// - `InvalidState` when the student is not active.
    /// - `Conflict` when the student already checked in on that date.
    pub fn check_in(&self, request: &CheckInRequest) -> ServiceResult<AttendanceRecord> {
        let student: Student =
            require_record(&self.store, self.organization_id, request.student_id)?;
        if student.status != StudentStatus::Active {
            return Err(ServiceError::InvalidState(format!(
                "student {} is {} and cannot check in",
                student.id,
                student.status.as_str()
            )));
        }

        let settings = load_settings(&self.store, self.organization_id)?;
        let status = if settings.is_late_check_in(request.at_epoch_ms) {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };

        let existing = self.find_record(student.id, request.date)?;
        let record_id = match existing {
            Some(record) if record.check_in_at.is_some() => {
                return Err(ServiceError::Conflict(format!(
                    "student {} already checked in on {}",
                    student.id, request.date
                )));
            }
            Some(mut record) => {
                record.status = status;
                record.class_id = student.class_id;
                record.check_in_at = Some(request.at_epoch_ms);
                record.checked_in_by = request.checked_in_by.clone();
                record.notes = request.notes.clone().or(record.notes);
                self.store.update_record(self.organization_id, &record)?;
                record.id
            }
            None => {
                let mut record =
                    AttendanceRecord::new(student.id, student.class_id, request.date, status);
                record.check_in_at = Some(request.at_epoch_ms);
                record.checked_in_by = request.checked_in_by.clone();
                record.notes = request.notes.clone();
                self.store.create_record(self.organization_id, &record)?
            }
        };

        info!(
            "event=attendance_check_in module=service status=ok organization_id={} student_id={} attendance_status={}",
            self.organization_id,
            student.id,
            status.as_str()
        );
        read_back(
            &self.store,
            self.organization_id,
            record_id,
            "checked-in record not found in read-back",
        )
    }

    /// Checks a student out after a check-in on the same date.
    pub fn check_out(
        &self,
        student_id: RecordId,
        date: NaiveDate,
        at_epoch_ms: i64,
        checked_out_by: Option<String>,
    ) -> ServiceResult<AttendanceRecord> {
        let mut record = self.find_record(student_id, date)?.ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "student {student_id} has no check-in on {date}"
            ))
        })?;
        let Some(check_in_at) = record.check_in_at else {
            return Err(ServiceError::InvalidState(format!(
                "student {student_id} was marked {} on {date}",
                record.status.as_str()
            )));
        };
        if record.check_out_at.is_some() {
            return Err(ServiceError::Conflict(format!(
                "student {student_id} already checked out on {date}"
            )));
        }
        if at_epoch_ms < check_in_at {
            return Err(ValidationError::invalid(
                "check_out_at",
                "must not be earlier than check_in_at",
            )
            .into());
        }

        record.check_out_at = Some(at_epoch_ms);
        record.checked_out_by = checked_out_by;
        self.store.update_record(self.organization_id, &record)?;

        info!(
            "event=attendance_check_out module=service status=ok organization_id={} student_id={student_id}",
            self.organization_id
        );
        read_back(
            &self.store,
            self.organization_id,
            record.id,
            "checked-out record not found in read-back",
        )
    }

    /// Records an absence, excused or not, for a student who has not checked in.
    pub fn mark_absent(
        &self,
        student_id: RecordId,
        date: NaiveDate,
        excused: bool,
        notes: Option<String>,
    ) -> ServiceResult<AttendanceRecord> {
        let student: Student = require_record(&self.store, self.organization_id, student_id)?;
        let status = if excused {
            AttendanceStatus::Excused
        } else {
            AttendanceStatus::Absent
        };

        let record_id = match self.find_record(student_id, date)? {
            Some(record) if record.check_in_at.is_some() => {
                return Err(ServiceError::Conflict(format!(
                    "student {student_id} already checked in on {date}"
                )));
            }
            Some(mut record) => {
                record.status = status;
                record.notes = notes;
                self.store.update_record(self.organization_id, &record)?;
                record.id
            }
            None => {
                let mut record = AttendanceRecord::new(student_id, student.class_id, date, status);
                record.notes = notes;
                self.store.create_record(self.organization_id, &record)?
            }
        };

        info!(
            "event=attendance_absent module=service status=ok organization_id={} student_id={student_id} attendance_status={}",
            self.organization_id,
            status.as_str()
        );
        read_back(
            &self.store,
            self.organization_id,
            record_id,
            "absence record not found in read-back",
        )
    }

    /// Replaces a record for corrections; student and date cannot change.
    pub fn update_record(&self, record: &AttendanceRecord) -> ServiceResult<AttendanceRecord> {
        let existing: AttendanceRecord =
            require_record(&self.store, self.organization_id, record.id)?;
        if existing.student_id != record.student_id || existing.date != record.date {
            return Err(ServiceError::InvalidState(
                "attendance student and date are immutable".to_string(),
            ));
        }
        self.store.update_record(self.organization_id, record)?;
        read_back(
            &self.store,
            self.organization_id,
            record.id,
            "updated attendance not found in read-back",
        )
    }

    pub fn delete_record(&self, id: RecordId) -> ServiceResult<()> {
        self.store
            .delete_record::<AttendanceRecord>(self.organization_id, id)?;
        info!(
            "event=attendance_delete module=service status=ok organization_id={} attendance_id={id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists all records for one date ordered by check-in time.
    ///
    /// Records without a check-in (absences) come last.
    pub fn attendance_for_date(&self, date: NaiveDate) -> ServiceResult<Vec<AttendanceRecord>> {
        let query = DocumentQuery::new().filter(Filter::eq("date", date.to_string()));
        let mut records: Vec<AttendanceRecord> =
            self.store.list_records(self.organization_id, &query)?;
        records.sort_by_key(|record| (record.check_in_at.is_none(), record.check_in_at));
        Ok(records)
    }

    /// Lists one student's records within `[from, to]` ordered by date.
    pub fn attendance_for_student(
        &self,
        student_id: RecordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<AttendanceRecord>> {
        let query = date_range_query(from, to)?
            .filter(Filter::eq("student_id", student_id.to_string()))
            .order_by("date", OrderDirection::Asc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Records of students checked in and not yet checked out on `date`.
    pub fn currently_checked_in(&self, date: NaiveDate) -> ServiceResult<Vec<AttendanceRecord>> {
        let mut records = self.attendance_for_date(date)?;
        records.retain(AttendanceRecord::is_on_site);
        Ok(records)
    }

    /// Counts records per status and active students not yet recorded.
    pub fn daily_summary(&self, date: NaiveDate) -> ServiceResult<AttendanceSummary> {
        let records = self.attendance_for_date(date)?;
        let rate = AttendanceRate::from_records(&records);
        let checked_out = records
            .iter()
            .filter(|record| record.check_out_at.is_some())
            .count();

        let active_query =
            DocumentQuery::new().filter(Filter::eq("status", StudentStatus::Active.as_str()));
        let active: Vec<Student> = self.store.list_records(self.organization_id, &active_query)?;
        let not_recorded = active
            .iter()
            .filter(|student| !records.iter().any(|record| record.student_id == student.id))
            .count();

        Ok(AttendanceSummary {
            date,
            present: rate.present,
            late: rate.late,
            absent: rate.absent,
            excused: rate.excused,
            checked_out: u32::try_from(checked_out).unwrap_or(u32::MAX),
            not_recorded: u32::try_from(not_recorded).unwrap_or(u32::MAX),
        })
    }

    /// Attendance rate of one student over `[from, to]`.
    pub fn student_attendance_rate(
        &self,
        student_id: RecordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<AttendanceRate> {
        require_record::<_, Student>(&self.store, self.organization_id, student_id)?;
        let records = self.attendance_for_student(student_id, from, to)?;
        Ok(AttendanceRate::from_records(&records))
    }

    /// Attendance rate of all records taken for one class over `[from, to]`.
    pub fn class_attendance_rate(
        &self,
        class_id: RecordId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<AttendanceRate> {
        require_record::<_, Class>(&self.store, self.organization_id, class_id)?;
        let query =
            date_range_query(from, to)?.filter(Filter::eq("class_id", class_id.to_string()));
        let records: Vec<AttendanceRecord> =
            self.store.list_records(self.organization_id, &query)?;
        Ok(AttendanceRate::from_records(&records))
    }

    fn find_record(
        &self,
        student_id: RecordId,
        date: NaiveDate,
    ) -> ServiceResult<Option<AttendanceRecord>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("student_id", student_id.to_string()))
            .filter(Filter::eq("date", date.to_string()))
            .limit(1);
        let records: Vec<AttendanceRecord> =
            self.store.list_records(self.organization_id, &query)?;
        Ok(records.into_iter().next())
    }
}

fn date_range_query(from: NaiveDate, to: NaiveDate) -> ServiceResult<DocumentQuery> {
    if from > to {
        return Err(
            ValidationError::invalid("date_range", "`from` must not be after `to`").into(),
        );
    }
    Ok(DocumentQuery::new()
        .filter(Filter::gte("date", from.to_string()))
        .filter(Filter::lte("date", to.to_string())))
}
