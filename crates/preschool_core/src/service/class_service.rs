//! Program and class use-cases.
//!
//! # Invariants
//! - A class may only reference an existing program.
//! - A program referenced by any class cannot be deleted.
//! - A class with active students cannot be deleted or shrunk below its
//!   current enrollment.
//! - Deleting a class or program clears it from every student that still
//!   references it, in the same batch.

use crate::model::class::{Class, Program};
use crate::model::staff::Staff;
use crate::model::student::{Student, StudentStatus};
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{BatchWrite, DocumentQuery, DocumentStore, Filter};
use crate::repo::record_store::RecordStore;
use crate::service::error::{
    ensure_absent, read_back, require_record, ServiceError, ServiceResult,
};
use crate::service::student_service::{active_enrollment, sort_by_name};
use log::info;

/// Seat usage of one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassOccupancy {
    pub class_id: RecordId,
    pub capacity: u32,
    /// Active students assigned to the class.
    pub enrolled: u32,
    /// Free seats; zero when over capacity.
    pub available: u32,
}

/// Class and program service facade over a document store.
pub struct ClassService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> ClassService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    pub fn create_program(&self, program: &Program) -> ServiceResult<Program> {
        self.store.create_record(self.organization_id, program)?;
        info!(
            "event=program_create module=service status=ok organization_id={} program_id={}",
            self.organization_id, program.id
        );
        read_back(
            &self.store,
            self.organization_id,
            program.id,
            "created program not found in read-back",
        )
    }

    pub fn get_program(&self, id: RecordId) -> ServiceResult<Option<Program>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    pub fn update_program(&self, program: &Program) -> ServiceResult<Program> {
        self.store.update_record(self.organization_id, program)?;
        read_back(
            &self.store,
            self.organization_id,
            program.id,
            "updated program not found in read-back",
        )
    }

    /// Deletes a program that no class references and detaches its students.
    pub fn delete_program(&self, id: RecordId) -> ServiceResult<()> {
        require_record::<_, Program>(&self.store, self.organization_id, id)?;
        let query = DocumentQuery::new().filter(Filter::eq("program_id", id.to_string()));
        let classes = self.store.count_records::<Class>(self.organization_id, &query)?;
        if classes > 0 {
            return Err(ServiceError::Conflict(format!(
                "program {id} is used by {classes} class(es)"
            )));
        }

        let students = self.students_referencing("program_id", id)?;
        let mut writes = Vec::with_capacity(students.len() + 1);
        for mut student in students {
            student.program_id = None;
            writes.push(BatchWrite::put_record(&student)?);
        }
        writes.push(BatchWrite::delete_record::<Program>(id));
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=program_delete module=service status=ok organization_id={} program_id={id} detached_students={}",
            self.organization_id,
            writes.len() - 1
        );
        Ok(())
    }

    /// Lists programs sorted by name.
    pub fn list_programs(&self) -> ServiceResult<Vec<Program>> {
        let mut programs: Vec<Program> = self
            .store
            .list_records(self.organization_id, &DocumentQuery::new())?;
        programs.sort_by_cached_key(|program| program.name.trim().to_lowercase());
        Ok(programs)
    }

    /// Creates a class. Teacher links start empty; staff assignment owns them.
    pub fn create_class(&self, class: &Class) -> ServiceResult<Class> {
        let mut class = class.clone();
        class.teacher_ids.clear();
        ensure_absent(&self.store, self.organization_id, &class)?;
        self.ensure_program(&class)?;

        self.store.create_record(self.organization_id, &class)?;
        info!(
            "event=class_create module=service status=ok organization_id={} class_id={} capacity={}",
            self.organization_id, class.id, class.capacity
        );
        read_back(
            &self.store,
            self.organization_id,
            class.id,
            "created class not found in read-back",
        )
    }

    pub fn get_class(&self, id: RecordId) -> ServiceResult<Option<Class>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    /// Replaces class fields; teacher links are kept from the stored record.
    ///
    /// # Errors
    /// - `Conflict` when the new capacity is below current active enrollment.
    pub fn update_class(&self, class: &Class) -> ServiceResult<Class> {
        let existing: Class = require_record(&self.store, self.organization_id, class.id)?;
        let mut class = class.clone();
        class.teacher_ids = existing.teacher_ids;
        self.ensure_program(&class)?;

        let enrolled = active_enrollment(&self.store, self.organization_id, class.id)?;
        if u64::from(class.capacity) < enrolled {
            return Err(ServiceError::Conflict(format!(
                "class {} has {enrolled} active students; capacity {} is too small",
                class.id, class.capacity
            )));
        }

        self.store.update_record(self.organization_id, &class)?;
        read_back(
            &self.store,
            self.organization_id,
            class.id,
            "updated class not found in read-back",
        )
    }

    /// Deletes a class without active students.
    ///
    /// Assigned staff lose the class and remaining (non-active) students are
    /// detached from it.
    pub fn delete_class(&self, id: RecordId) -> ServiceResult<()> {
        let class: Class = require_record(&self.store, self.organization_id, id)?;
        let enrolled = active_enrollment(&self.store, self.organization_id, id)?;
        if enrolled > 0 {
            return Err(ServiceError::Conflict(format!(
                "class {id} still has {enrolled} active students"
            )));
        }

        let students = self.students_referencing("class_id", id)?;
        let mut writes = Vec::with_capacity(class.teacher_ids.len() + students.len() + 1);
        for mut student in students {
            student.class_id = None;
            writes.push(BatchWrite::put_record(&student)?);
        }
        for staff_id in &class.teacher_ids {
            let Some(mut staff) = self
                .store
                .get_record::<Staff>(self.organization_id, *staff_id)?
            else {
                continue;
            };
            staff.class_ids.retain(|linked| *linked != id);
            writes.push(BatchWrite::put_record(&staff)?);
        }
        writes.push(BatchWrite::delete_record::<Class>(id));
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=class_delete module=service status=ok organization_id={} class_id={id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists classes sorted by name.
    pub fn list_classes(&self) -> ServiceResult<Vec<Class>> {
        let mut classes: Vec<Class> = self
            .store
            .list_records(self.organization_id, &DocumentQuery::new())?;
        classes.sort_by_cached_key(|class| class.name.trim().to_lowercase());
        Ok(classes)
    }

    /// Active students of one class, sorted by name.
    pub fn class_roster(&self, class_id: RecordId) -> ServiceResult<Vec<Student>> {
        require_record::<_, Class>(&self.store, self.organization_id, class_id)?;
        let query = DocumentQuery::new()
            .filter(Filter::eq("status", StudentStatus::Active.as_str()))
            .filter(Filter::eq("class_id", class_id.to_string()));
        let mut roster: Vec<Student> = self.store.list_records(self.organization_id, &query)?;
        sort_by_name(&mut roster);
        Ok(roster)
    }

    pub fn class_occupancy(&self, class_id: RecordId) -> ServiceResult<ClassOccupancy> {
        let class: Class = require_record(&self.store, self.organization_id, class_id)?;
        let enrolled = active_enrollment(&self.store, self.organization_id, class_id)?;
        let enrolled = u32::try_from(enrolled).unwrap_or(u32::MAX);
        Ok(ClassOccupancy {
            class_id,
            capacity: class.capacity,
            enrolled,
            available: class.capacity.saturating_sub(enrolled),
        })
    }

    fn students_referencing(&self, field: &str, id: RecordId) -> ServiceResult<Vec<Student>> {
        let query = DocumentQuery::new().filter(Filter::eq(field, id.to_string()));
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    fn ensure_program(&self, class: &Class) -> ServiceResult<()> {
        if let Some(program_id) = class.program_id {
            require_record::<_, Program>(&self.store, self.organization_id, program_id)?;
        }
        Ok(())
    }
}
