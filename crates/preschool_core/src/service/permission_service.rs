//! Role permission checks with per-organization overrides.
//!
//! # Invariants
//! - At most one override document exists per role.
//! - Inactive staff hold no permissions.

use crate::model::permission::{default_permissions, Permission, RolePermissions};
use crate::model::staff::{Staff, StaffRole};
use crate::model::{OrganizationId, RecordId};
use crate::repo::document_store::{BatchWrite, DocumentQuery, DocumentStore, Filter};
use crate::repo::record_store::RecordStore;
use crate::service::error::{require_record, ServiceError, ServiceResult};
use log::{info, warn};

pub struct PermissionService<S: DocumentStore> {
    store: S,
    organization_id: OrganizationId,
}

impl<S: DocumentStore> PermissionService<S> {
    pub fn new(store: S, organization_id: OrganizationId) -> Self {
        Self {
            store,
            organization_id,
        }
    }

    /// Effective permissions of a role: the stored override or the defaults.
    pub fn permissions_for_role(&self, role: StaffRole) -> ServiceResult<Vec<Permission>> {
        Ok(match self.find_override(role)? {
            Some(stored) => stored.permissions,
            None => default_permissions(role).to_vec(),
        })
    }

    /// Replaces the permission set of a role for this organization.
    pub fn set_role_permissions(
        &self,
        role: StaffRole,
        permissions: &[Permission],
    ) -> ServiceResult<Vec<Permission>> {
        let mut record = RolePermissions::new(role, permissions);
        if let Some(existing) = self.find_override(role)? {
            record.id = existing.id;
        }
        self.store
            .write_batch(self.organization_id, &[BatchWrite::put_record(&record)?])?;

        info!(
            "event=role_permissions_set module=service status=ok organization_id={} role={} permissions={}",
            self.organization_id,
            role.as_str(),
            record.permissions.len()
        );
        Ok(record.permissions)
    }

    /// Drops a role override. Returns whether one existed.
    pub fn reset_role_permissions(&self, role: StaffRole) -> ServiceResult<bool> {
        let Some(existing) = self.find_override(role)? else {
            return Ok(false);
        };
        self.store
            .delete_record::<RolePermissions>(self.organization_id, existing.id)?;
        info!(
            "event=role_permissions_reset module=service status=ok organization_id={} role={}",
            self.organization_id,
            role.as_str()
        );
        Ok(true)
    }

    pub fn staff_has_permission(
        &self,
        staff_id: RecordId,
        permission: Permission,
    ) -> ServiceResult<bool> {
        let staff: Staff = require_record(&self.store, self.organization_id, staff_id)?;
        if !staff.active {
            return Ok(false);
        }
        Ok(self.permissions_for_role(staff.role)?.contains(&permission))
    }

    /// Fails with `PermissionDenied` unless the staff member holds `permission`.
    pub fn require_permission(
        &self,
        staff_id: RecordId,
        permission: Permission,
    ) -> ServiceResult<()> {
        if self.staff_has_permission(staff_id, permission)? {
            return Ok(());
        }
        warn!(
            "event=permission_check module=service status=error organization_id={} staff_id={staff_id} permission={} error_code=permission_denied",
            self.organization_id,
            permission.as_str()
        );
        Err(ServiceError::PermissionDenied {
            staff_id,
            permission,
        })
    }

    fn find_override(&self, role: StaffRole) -> ServiceResult<Option<RolePermissions>> {
        let query = DocumentQuery::new()
            .filter(Filter::eq("role", role.as_str()))
            .limit(1);
        let stored: Vec<RolePermissions> = self.store.list_records(self.organization_id, &query)?;
        Ok(stored.into_iter().next())
    }
}
