//! Student, guardian and waitlist use-cases.
//!
//! # Responsibility
//! - Provide student and guardian CRUD scoped to one organization.
//! - Run the waitlist admission flow (apply, position, approve, reject).
//! - Keep guardian/student links symmetric.
//!
//! # Invariants
//! - Link changes write both sides in one batch.
//! - `update_*` never touches link lists; use `link_guardian`/`unlink_guardian`.
//! - Enrollment never puts more active students in a class than its capacity,
//!   or in the organization than its licensed capacity.
//! - A class assignment must fit the class age band.
//! - Student lists are sorted by last name, then first name, case-insensitive.

use crate::model::class::{Class, Program};
use crate::model::student::{Guardian, Student, StudentStatus};
use crate::model::{now_epoch_ms, OrganizationId, RecordId};
use crate::repo::document_store::{
    BatchWrite, DocumentQuery, DocumentStore, Filter, OrderDirection,
};
use crate::repo::record_store::RecordStore;
use crate::service::error::{
    ensure_absent, read_back, require_record, ServiceError, ServiceResult,
};
use crate::service::organization_service::load_settings;
use chrono::{NaiveDate, Utc};
use log::info;

/// Optional filters for [`StudentService::list_students`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub status: Option<StudentStatus>,
    pub class_id: Option<RecordId>,
    pub program_id: Option<RecordId>,
    /// Case-insensitive substring of the full name.
    pub name_query: Option<String>,
}

/// Student service facade over a document store.
pub struct StudentService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> StudentService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Creates one student and links any listed guardians.
    ///
    /// A waitlisted student without an application time is stamped with now.
    pub fn create_student(&self, student: &Student) -> ServiceResult<Student> {
        let mut student = student.clone();
        dedup_ids(&mut student.guardian_ids);
        if student.status == StudentStatus::Waitlist && student.waitlist_applied_at.is_none() {
            student.waitlist_applied_at = Some(now_epoch_ms());
        }
        ensure_absent(&self.store, self.organization_id, &student)?;
        self.ensure_placement(&student, None)?;
        if student.is_enrolled() {
            self.ensure_licensed_seat()?;
            if let Some(class_id) = student.class_id {
                self.ensure_seat(class_id)?;
            }
        }

        let mut writes = Vec::with_capacity(student.guardian_ids.len() + 1);
        writes.push(BatchWrite::put_record(&student)?);
        for guardian_id in &student.guardian_ids {
            let mut guardian: Guardian =
                require_record(&self.store, self.organization_id, *guardian_id)?;
            if !guardian.student_ids.contains(&student.id) {
                guardian.student_ids.push(student.id);
                writes.push(BatchWrite::put_record(&guardian)?);
            }
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=student_create module=service status=ok organization_id={} student_id={} student_status={} guardians={}",
            self.organization_id,
            student.id,
            student.status.as_str(),
            student.guardian_ids.len()
        );
        read_back(
            &self.store,
            self.organization_id,
            student.id,
            "created student not found in read-back",
        )
    }

    pub fn get_student(&self, id: RecordId) -> ServiceResult<Option<Student>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    /// Replaces student fields; guardian links are kept from the stored record.
    ///
    /// Class and program references are only checked when they change.
    pub fn update_student(&self, student: &Student) -> ServiceResult<Student> {
        let existing: Student = require_record(&self.store, self.organization_id, student.id)?;
        let mut student = student.clone();
        student.guardian_ids = existing.guardian_ids.clone();
        self.ensure_placement(&student, Some(&existing))?;
        if student.is_enrolled() && !existing.is_enrolled() {
            self.ensure_licensed_seat()?;
        }
        let joins_class = student.is_enrolled()
            && student.class_id.is_some()
            && (!existing.is_enrolled() || existing.class_id != student.class_id);
        if let (true, Some(class_id)) = (joins_class, student.class_id) {
            self.ensure_seat(class_id)?;
        }

        self.store.update_record(self.organization_id, &student)?;
        read_back(
            &self.store,
            self.organization_id,
            student.id,
            "updated student not found in read-back",
        )
    }

    /// Hard-deletes a student and removes it from its guardians.
    pub fn delete_student(&self, id: RecordId) -> ServiceResult<()> {
        let student: Student = require_record(&self.store, self.organization_id, id)?;

        let mut writes = Vec::with_capacity(student.guardian_ids.len() + 1);
        for guardian_id in &student.guardian_ids {
            let Some(mut guardian) = self
                .store
                .get_record::<Guardian>(self.organization_id, *guardian_id)?
            else {
                continue;
            };
            guardian.student_ids.retain(|linked| *linked != id);
            writes.push(BatchWrite::put_record(&guardian)?);
        }
        writes.push(BatchWrite::delete_record::<Student>(id));
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=student_delete module=service status=ok organization_id={} student_id={id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists students matching `filter`, sorted by last then first name.
    pub fn list_students(&self, filter: &StudentFilter) -> ServiceResult<Vec<Student>> {
        let mut query = DocumentQuery::new();
        if let Some(status) = filter.status {
            query = query.filter(Filter::eq("status", status.as_str()));
        }
        if let Some(class_id) = filter.class_id {
            query = query.filter(Filter::eq("class_id", class_id.to_string()));
        }
        if let Some(program_id) = filter.program_id {
            query = query.filter(Filter::eq("program_id", program_id.to_string()));
        }

        let mut students: Vec<Student> = self.store.list_records(self.organization_id, &query)?;
        if let Some(name_query) = normalized_name_query(filter.name_query.as_deref()) {
            students.retain(|student| student.full_name().to_lowercase().contains(&name_query));
        }
        sort_by_name(&mut students);
        Ok(students)
    }

    /// Lists active students assigned to one class.
    pub fn students_in_class(&self, class_id: RecordId) -> ServiceResult<Vec<Student>> {
        require_record::<_, Class>(&self.store, self.organization_id, class_id)?;
        self.list_students(&StudentFilter {
            status: Some(StudentStatus::Active),
            class_id: Some(class_id),
            ..StudentFilter::default()
        })
    }

    /// Registers a new applicant at the back of the waitlist.
    pub fn add_to_waitlist(&self, student: &Student) -> ServiceResult<Student> {
        let mut applicant = student.clone();
        applicant.status = StudentStatus::Waitlist;
        applicant.class_id = None;
        applicant.enrollment_date = None;
        applicant.waitlist_applied_at = Some(now_epoch_ms());
        self.create_student(&applicant)
    }

    /// Lists waitlisted students in application order.
    pub fn list_waitlist(&self) -> ServiceResult<Vec<Student>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("status", StudentStatus::Waitlist.as_str()))
            .order_by("waitlist_applied_at", OrderDirection::Asc);
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Returns the 1-based queue position of a waitlisted student.
    pub fn waitlist_position(&self, id: RecordId) -> ServiceResult<u32> {
        let student: Student = require_record(&self.store, self.organization_id, id)?;
        if student.status != StudentStatus::Waitlist {
            return Err(ServiceError::InvalidState(format!(
                "student {id} is {} and not on the waitlist",
                student.status.as_str()
            )));
        }
        self.list_waitlist()?
            .iter()
            .position(|queued| queued.id == id)
            .and_then(|index| u32::try_from(index + 1).ok())
            .ok_or(ServiceError::InconsistentState(
                "waitlisted student missing from waitlist query",
            ))
    }

    /// Admits a waitlisted student into a class.
    ///
    /// # Errors
    /// - `InvalidState` when the student is not waitlisted.
    /// - `NotFound` when the student or class does not exist.
    /// - `Conflict` when the class or the organization is full, or the class
    ///   is outside the student's age band.
    pub fn approve_waitlisted(
        &self,
        id: RecordId,
        class_id: RecordId,
        enrollment_date: NaiveDate,
    ) -> ServiceResult<Student> {
        let mut student: Student = require_record(&self.store, self.organization_id, id)?;
        if student.status != StudentStatus::Waitlist {
            return Err(ServiceError::InvalidState(format!(
                "only waitlisted students can be approved; student {id} is {}",
                student.status.as_str()
            )));
        }
        let (class, enrolled) = self.ensure_seat(class_id)?;
        ensure_age_band(&class, &student, enrollment_date)?;
        self.ensure_licensed_seat()?;

        student.status = StudentStatus::Active;
        student.class_id = Some(class_id);
        student.enrollment_date = Some(enrollment_date);
        if student.program_id.is_none() {
            student.program_id = class.program_id;
        }
        self.store.update_record(self.organization_id, &student)?;

        info!(
            "event=waitlist_approve module=service status=ok organization_id={} student_id={id} class_id={class_id} enrolled={}",
            self.organization_id,
            enrolled + 1
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "approved student not found in read-back",
        )
    }

    /// Moves a waitlisted applicant to withdrawn.
    pub fn reject_waitlisted(&self, id: RecordId) -> ServiceResult<Student> {
        let mut student: Student = require_record(&self.store, self.organization_id, id)?;
        if student.status != StudentStatus::Waitlist {
            return Err(ServiceError::InvalidState(format!(
                "only waitlisted students can be rejected; student {id} is {}",
                student.status.as_str()
            )));
        }
        student.status = StudentStatus::Withdrawn;
        self.store.update_record(self.organization_id, &student)?;

        info!(
            "event=waitlist_reject module=service status=ok organization_id={} student_id={id}",
            self.organization_id
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "rejected student not found in read-back",
        )
    }

    /// Withdraws a student and frees its class seat.
    pub fn withdraw_student(&self, id: RecordId) -> ServiceResult<Student> {
        let mut student: Student = require_record(&self.store, self.organization_id, id)?;
        if student.status == StudentStatus::Withdrawn {
            return Err(ServiceError::InvalidState(format!(
                "student {id} is already withdrawn"
            )));
        }
        student.status = StudentStatus::Withdrawn;
        student.class_id = None;
        self.store.update_record(self.organization_id, &student)?;

        info!(
            "event=student_withdraw module=service status=ok organization_id={} student_id={id}",
            self.organization_id
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "withdrawn student not found in read-back",
        )
    }

    /// Creates one guardian and links any listed students.
    pub fn create_guardian(&self, guardian: &Guardian) -> ServiceResult<Guardian> {
        let mut guardian = guardian.clone();
        dedup_ids(&mut guardian.student_ids);
        ensure_absent(&self.store, self.organization_id, &guardian)?;

        let mut writes = Vec::with_capacity(guardian.student_ids.len() + 1);
        writes.push(BatchWrite::put_record(&guardian)?);
        for student_id in &guardian.student_ids {
            let mut student: Student =
                require_record(&self.store, self.organization_id, *student_id)?;
            if !student.guardian_ids.contains(&guardian.id) {
                student.guardian_ids.push(guardian.id);
                writes.push(BatchWrite::put_record(&student)?);
            }
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=guardian_create module=service status=ok organization_id={} guardian_id={} students={}",
            self.organization_id,
            guardian.id,
            guardian.student_ids.len()
        );
        read_back(
            &self.store,
            self.organization_id,
            guardian.id,
            "created guardian not found in read-back",
        )
    }

    pub fn get_guardian(&self, id: RecordId) -> ServiceResult<Option<Guardian>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    /// Replaces guardian fields; student links are kept from the stored record.
    pub fn update_guardian(&self, guardian: &Guardian) -> ServiceResult<Guardian> {
        let existing: Guardian = require_record(&self.store, self.organization_id, guardian.id)?;
        let mut guardian = guardian.clone();
        guardian.student_ids = existing.student_ids;

        self.store.update_record(self.organization_id, &guardian)?;
        read_back(
            &self.store,
            self.organization_id,
            guardian.id,
            "updated guardian not found in read-back",
        )
    }

    /// Hard-deletes a guardian and removes it from its students.
    pub fn delete_guardian(&self, id: RecordId) -> ServiceResult<()> {
        let guardian: Guardian = require_record(&self.store, self.organization_id, id)?;

        let mut writes = Vec::with_capacity(guardian.student_ids.len() + 1);
        for student_id in &guardian.student_ids {
            let Some(mut student) = self
                .store
                .get_record::<Student>(self.organization_id, *student_id)?
            else {
                continue;
            };
            student.guardian_ids.retain(|linked| *linked != id);
            writes.push(BatchWrite::put_record(&student)?);
        }
        writes.push(BatchWrite::delete_record::<Guardian>(id));
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=guardian_delete module=service status=ok organization_id={} guardian_id={id}",
            self.organization_id
        );
        Ok(())
    }

    /// Links a guardian and a student on both sides. Linking twice is a no-op.
    pub fn link_guardian(&self, guardian_id: RecordId, student_id: RecordId) -> ServiceResult<()> {
        let mut guardian: Guardian = require_record(&self.store, self.organization_id, guardian_id)?;
        let mut student: Student = require_record(&self.store, self.organization_id, student_id)?;

        let mut writes = Vec::with_capacity(2);
        if !guardian.student_ids.contains(&student_id) {
            guardian.student_ids.push(student_id);
            writes.push(BatchWrite::put_record(&guardian)?);
        }
        if !student.guardian_ids.contains(&guardian_id) {
            student.guardian_ids.push(guardian_id);
            writes.push(BatchWrite::put_record(&student)?);
        }
        if writes.is_empty() {
            return Ok(());
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=guardian_link module=service status=ok organization_id={} guardian_id={guardian_id} student_id={student_id}",
            self.organization_id
        );
        Ok(())
    }

    /// Removes a guardian/student link on both sides. Unlinking twice is a no-op.
    pub fn unlink_guardian(
        &self,
        guardian_id: RecordId,
        student_id: RecordId,
    ) -> ServiceResult<()> {
        let mut guardian: Guardian = require_record(&self.store, self.organization_id, guardian_id)?;
        let mut student: Student = require_record(&self.store, self.organization_id, student_id)?;

        let mut writes = Vec::with_capacity(2);
        if guardian.student_ids.contains(&student_id) {
            guardian.student_ids.retain(|linked| *linked != student_id);
            writes.push(BatchWrite::put_record(&guardian)?);
        }
        if student.guardian_ids.contains(&guardian_id) {
            student.guardian_ids.retain(|linked| *linked != guardian_id);
            writes.push(BatchWrite::put_record(&student)?);
        }
        if writes.is_empty() {
            return Ok(());
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=guardian_unlink module=service status=ok organization_id={} guardian_id={guardian_id} student_id={student_id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists guardians linked to one student in creation order.
    pub fn guardians_for_student(&self, student_id: RecordId) -> ServiceResult<Vec<Guardian>> {
        require_record::<_, Student>(&self.store, self.organization_id, student_id)?;
        let query =
            DocumentQuery::new().filter(Filter::contains("student_ids", student_id.to_string()));
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    /// Returns the class and its active enrollment when a seat is free.
    fn ensure_seat(&self, class_id: RecordId) -> ServiceResult<(Class, u64)> {
        let class: Class = require_record(&self.store, self.organization_id, class_id)?;
        let enrolled = active_enrollment(&self.store, self.organization_id, class_id)?;
        if enrolled >= u64::from(class.capacity) {
            return Err(ServiceError::Conflict(format!(
                "class {class_id} is full ({enrolled}/{})",
                class.capacity
            )));
        }
        Ok((class, enrolled))
    }

    /// Fails when the organization already has as many active students as
    /// its licensed capacity.
    fn ensure_licensed_seat(&self) -> ServiceResult<()> {
        let settings = load_settings(&self.store, self.organization_id)?;
        let query =
            DocumentQuery::new().filter(Filter::eq("status", StudentStatus::Active.as_str()));
        let active = self
            .store
            .count_records::<Student>(self.organization_id, &query)?;
        if active >= u64::from(settings.capacity) {
            return Err(ServiceError::Conflict(format!(
                "organization is at its licensed capacity ({active}/{})",
                settings.capacity
            )));
        }
        Ok(())
    }

    /// Checks class and program references that differ from `previous`.
    fn ensure_placement(
        &self,
        student: &Student,
        previous: Option<&Student>,
    ) -> ServiceResult<()> {
        let class_changed = previous.map_or(true, |stored| stored.class_id != student.class_id);
        let program_changed =
            previous.map_or(true, |stored| stored.program_id != student.program_id);

        if let (true, Some(class_id)) = (class_changed, student.class_id) {
            let class: Class = require_record(&self.store, self.organization_id, class_id)?;
            let on = student
                .enrollment_date
                .unwrap_or_else(|| Utc::now().date_naive());
            ensure_age_band(&class, student, on)?;
        }
        if let (true, Some(program_id)) = (program_changed, student.program_id) {
            require_record::<_, Program>(&self.store, self.organization_id, program_id)?;
        }
        Ok(())
    }
}

fn ensure_age_band(class: &Class, student: &Student, on: NaiveDate) -> ServiceResult<()> {
    let age_months = student.age_in_months(on);
    if class.accepts_age(age_months) {
        return Ok(());
    }
    Err(ServiceError::Conflict(format!(
        "class {} does not accept age {age_months} months",
        class.id
    )))
}

/// Counts active students currently assigned to a class.
pub(crate) fn active_enrollment<S: DocumentStore + ?Sized>(
    store: &S,
    organization_id: OrganizationId,
    class_id: RecordId,
) -> ServiceResult<u64> {
    let query = DocumentQuery::new()
        .filter(Filter::eq("status", StudentStatus::Active.as_str()))
        .filter(Filter::eq("class_id", class_id.to_string()));
    Ok(store.count_records::<Student>(organization_id, &query)?)
}

pub(crate) fn sort_by_name(students: &mut [Student]) {
    students.sort_by_cached_key(|student| {
        (
            student.last_name.trim().to_lowercase(),
            student.first_name.trim().to_lowercase(),
        )
    });
}

fn normalized_name_query(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(str::to_lowercase)
}

fn dedup_ids(ids: &mut Vec<RecordId>) {
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::{dedup_ids, normalized_name_query, sort_by_name};
    use crate::model::student::Student;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, 14).unwrap()
    }

    #[test]
    fn sort_by_name_orders_last_then_first_ignoring_case() {
        let mut students = vec![
            Student::new("zoe", "Baker", dob()),
            Student::new("Ava", "baker", dob()),
            Student::new("Liam", "Adams", dob()),
        ];
        sort_by_name(&mut students);
        let names: Vec<String> = students.iter().map(Student::full_name).collect();
        assert_eq!(names, vec!["Liam Adams", "Ava baker", "zoe Baker"]);
    }

    #[test]
    fn blank_name_query_is_ignored() {
        assert_eq!(normalized_name_query(Some("   ")), None);
        assert_eq!(normalized_name_query(Some(" Ava ")), Some("ava".to_string()));
    }

    #[test]
    fn dedup_ids_keeps_first_occurrence_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut ids = vec![first, second, first];
        dedup_ids(&mut ids);
        assert_eq!(ids, vec![first, second]);
    }
}
