//! Organization (tenant) and settings use-cases.
//!
//! # Responsibility
//! - Create and edit tenant roots.
//! - Serve per-organization settings with defaults when none are stored.
//!
//! # Invariants
//! - Every created organization gets a stored settings document.
//! - Settings are only readable for organizations that exist.

use crate::model::organization::{Organization, OrganizationSettings};
use crate::model::OrganizationId;
use crate::repo::document_store::{BatchWrite, DocumentStore};
use crate::repo::organization_repo::OrganizationRepository;
use crate::repo::record_store::RecordStore;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

const ORGANIZATION_ENTITY: &str = "organizations";

/// Organization service facade over the tenant repository and document store.
pub struct OrganizationService<R: OrganizationRepository, S: DocumentStore> {
    repo: R,
    store: S,
}

impl<R: OrganizationRepository, S: DocumentStore> OrganizationService<R, S> {
    pub fn new(repo: R, store: S) -> Self {
        Self { repo, store }
    }

    /// Creates an organization and its default settings.
    pub fn create_organization(&self, organization: &Organization) -> ServiceResult<Organization> {
        let organization_id = self.repo.create_organization(organization)?;

        let mut settings = OrganizationSettings::default_for(organization_id);
        settings.school_name = organization.name.trim().to_string();
        self.store
            .write_batch(organization_id, &[BatchWrite::put_record(&settings)?])?;

        info!(
            "event=organization_create module=service status=ok organization_id={organization_id}"
        );
        self.repo
            .get_organization(organization_id)?
            .ok_or(ServiceError::InconsistentState(
                "created organization not found in read-back",
            ))
    }

    pub fn get_organization(&self, id: OrganizationId) -> ServiceResult<Option<Organization>> {
        Ok(self.repo.get_organization(id)?)
    }

    pub fn update_organization(&self, organization: &Organization) -> ServiceResult<Organization> {
        self.repo.update_organization(organization)?;
        self.repo
            .get_organization(organization.id)?
            .ok_or(ServiceError::InconsistentState(
                "updated organization not found in read-back",
            ))
    }

    pub fn list_organizations(&self) -> ServiceResult<Vec<Organization>> {
        Ok(self.repo.list_organizations()?)
    }

    /// Returns stored settings, or defaults named after the organization.
    pub fn get_settings(
        &self,
        organization_id: OrganizationId,
    ) -> ServiceResult<OrganizationSettings> {
        let organization = self.require_organization(organization_id)?;
        let stored = self
            .store
            .get_record::<OrganizationSettings>(organization_id, organization_id)?;
        Ok(stored.unwrap_or_else(|| {
            let mut settings = OrganizationSettings::default_for(organization_id);
            settings.school_name = organization.name;
            settings
        }))
    }

    /// Validates and stores settings for an existing organization.
    pub fn update_settings(
        &self,
        settings: &OrganizationSettings,
    ) -> ServiceResult<OrganizationSettings> {
        let organization_id = settings.organization_id;
        self.require_organization(organization_id)?;
        self.store
            .write_batch(organization_id, &[BatchWrite::put_record(settings)?])?;

        info!(
            "event=settings_update module=service status=ok organization_id={organization_id} meal_tracking={}",
            settings.meal_tracking_enabled
        );
        self.get_settings(organization_id)
    }

    fn require_organization(&self, id: OrganizationId) -> ServiceResult<Organization> {
        self.repo
            .get_organization(id)?
            .ok_or(ServiceError::NotFound {
                entity: ORGANIZATION_ENTITY,
                id,
            })
    }
}

/// Loads stored settings for internal rules, falling back to defaults.
pub(crate) fn load_settings<S: DocumentStore + ?Sized>(
    store: &S,
    organization_id: OrganizationId,
) -> ServiceResult<OrganizationSettings> {
    Ok(store
        .get_record::<OrganizationSettings>(organization_id, organization_id)?
        .unwrap_or_else(|| OrganizationSettings::default_for(organization_id)))
}
