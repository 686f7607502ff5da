//! Staff use-cases and staff/class assignment.
//!
//! # Invariants
//! - Staff emails are stored normalized and unique within an organization.
//! - Class assignment writes `Staff::class_ids` and `Class::teacher_ids` in
//!   one batch; only active staff can be assigned.

use crate::model::class::Class;
use crate::model::staff::{normalize_email, Staff, StaffRole};
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{BatchWrite, DocumentQuery, DocumentStore, Filter};
use crate::repo::record_store::RecordStore;
use crate::service::error::{
    ensure_absent, read_back, require_record, ServiceError, ServiceResult,
};
use log::info;

/// Optional filters for [`StaffService::list_staff`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaffFilter {
    pub role: Option<StaffRole>,
    pub active_only: bool,
}

/// Staff service facade over a document store.
pub struct StaffService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> StaffService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Creates a staff member with a normalized, organization-unique email.
    ///
    /// Class links start empty; use [`Self::assign_to_class`].
    pub fn create_staff(&self, staff: &Staff) -> ServiceResult<Staff> {
        let mut staff = staff.clone();
        staff.email = normalize_email(&staff.email);
        staff.class_ids.clear();
        ensure_absent(&self.store, self.organization_id, &staff)?;
        self.ensure_unique_email(&staff)?;

        self.store.create_record(self.organization_id, &staff)?;
        info!(
            "event=staff_create module=service status=ok organization_id={} staff_id={} role={}",
            self.organization_id,
            staff.id,
            staff.role.as_str()
        );
        read_back(
            &self.store,
            self.organization_id,
            staff.id,
            "created staff not found in read-back",
        )
    }

    pub fn get_staff(&self, id: RecordId) -> ServiceResult<Option<Staff>> {
        Ok(self.store.get_record(self.organization_id, id)?)
    }

    /// Replaces staff fields; class links are kept from the stored record.
    pub fn update_staff(&self, staff: &Staff) -> ServiceResult<Staff> {
        let existing: Staff = require_record(&self.store, self.organization_id, staff.id)?;
        let mut staff = staff.clone();
        staff.email = normalize_email(&staff.email);
        staff.class_ids = existing.class_ids;
        self.ensure_unique_email(&staff)?;

        self.store.update_record(self.organization_id, &staff)?;
        read_back(
            &self.store,
            self.organization_id,
            staff.id,
            "updated staff not found in read-back",
        )
    }

    /// Marks a staff member inactive. Class links are kept for history.
    pub fn deactivate_staff(&self, id: RecordId) -> ServiceResult<Staff> {
        let mut staff: Staff = require_record(&self.store, self.organization_id, id)?;
        if !staff.active {
            return Ok(staff);
        }
        staff.active = false;
        self.store.update_record(self.organization_id, &staff)?;

        info!(
            "event=staff_deactivate module=service status=ok organization_id={} staff_id={id}",
            self.organization_id
        );
        read_back(
            &self.store,
            self.organization_id,
            id,
            "deactivated staff not found in read-back",
        )
    }

    /// Hard-deletes a staff member and removes it from its classes.
    pub fn delete_staff(&self, id: RecordId) -> ServiceResult<()> {
        let staff: Staff = require_record(&self.store, self.organization_id, id)?;

        let mut writes = Vec::with_capacity(staff.class_ids.len() + 1);
        for class_id in &staff.class_ids {
            let Some(mut class) = self
                .store
                .get_record::<Class>(self.organization_id, *class_id)?
            else {
                continue;
            };
            class.teacher_ids.retain(|teacher| *teacher != id);
            writes.push(BatchWrite::put_record(&class)?);
        }
        writes.push(BatchWrite::delete_record::<Staff>(id));
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=staff_delete module=service status=ok organization_id={} staff_id={id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists staff sorted by last then first name.
    pub fn list_staff(&self, filter: StaffFilter) -> ServiceResult<Vec<Staff>> {
        let mut query = DocumentQuery::new();
        if let Some(role) = filter.role {
            query = query.filter(Filter::eq("role", role.as_str()));
        }
        if filter.active_only {
            query = query.filter(Filter::eq("active", true));
        }

        let mut staff: Vec<Staff> = self.store.list_records(self.organization_id, &query)?;
        staff.sort_by_cached_key(|member| {
            (
                member.last_name.trim().to_lowercase(),
                member.first_name.trim().to_lowercase(),
            )
        });
        Ok(staff)
    }

    /// Assigns an active staff member to a class. Assigning twice is a no-op.
    pub fn assign_to_class(&self, staff_id: RecordId, class_id: RecordId) -> ServiceResult<()> {
        let mut staff: Staff = require_record(&self.store, self.organization_id, staff_id)?;
        let mut class: Class = require_record(&self.store, self.organization_id, class_id)?;
        if !staff.active {
            return Err(ServiceError::InvalidState(format!(
                "staff {staff_id} is inactive and cannot be assigned"
            )));
        }

        let mut writes = Vec::with_capacity(2);
        if !staff.class_ids.contains(&class_id) {
            staff.class_ids.push(class_id);
            writes.push(BatchWrite::put_record(&staff)?);
        }
        if !class.teacher_ids.contains(&staff_id) {
            class.teacher_ids.push(staff_id);
            writes.push(BatchWrite::put_record(&class)?);
        }
        if writes.is_empty() {
            return Ok(());
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=staff_assign module=service status=ok organization_id={} staff_id={staff_id} class_id={class_id}",
            self.organization_id
        );
        Ok(())
    }

    /// Removes a staff/class assignment on both sides.
    pub fn remove_from_class(&self, staff_id: RecordId, class_id: RecordId) -> ServiceResult<()> {
        let mut staff: Staff = require_record(&self.store, self.organization_id, staff_id)?;
        let mut class: Class = require_record(&self.store, self.organization_id, class_id)?;

        let mut writes = Vec::with_capacity(2);
        if staff.class_ids.contains(&class_id) {
            staff.class_ids.retain(|linked| *linked != class_id);
            writes.push(BatchWrite::put_record(&staff)?);
        }
        if class.teacher_ids.contains(&staff_id) {
            class.teacher_ids.retain(|linked| *linked != staff_id);
            writes.push(BatchWrite::put_record(&class)?);
        }
        if writes.is_empty() {
            return Ok(());
        }
        self.store.write_batch(self.organization_id, &writes)?;

        info!(
            "event=staff_unassign module=service status=ok organization_id={} staff_id={staff_id} class_id={class_id}",
            self.organization_id
        );
        Ok(())
    }

    /// Lists staff assigned to one class in creation order.
    pub fn staff_for_class(&self, class_id: RecordId) -> ServiceResult<Vec<Staff>> {
        require_record::<_, Class>(&self.store, self.organization_id, class_id)?;
        let query =
            DocumentQuery::new().filter(Filter::contains("class_ids", class_id.to_string()));
        Ok(self.store.list_records(self.organization_id, &query)?)
    }

    fn ensure_unique_email(&self, staff: &Staff) -> ServiceResult<()> {
        let query = DocumentQuery::new().filter(Filter::eq("email", staff.email.as_str()));
        let holders: Vec<Staff> = self.store.list_records(self.organization_id, &query)?;
        if holders.iter().any(|holder| holder.id != staff.id) {
            return Err(ServiceError::Conflict(
                "staff email is already in use".to_string(),
            ));
        }
        Ok(())
    }
}
